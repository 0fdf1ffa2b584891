//! Debounced reconciliation scheduler.
//!
//! Turns a stream of configuration-change notifications into serialized
//! reconciliation runs:
//!
//! ```text
//! Idle --notification--> Pending --notification--> Pending (timer re-armed)
//! Pending --quiet for DEBOUNCE_WINDOW--> Running --done--> Idle
//! ```
//!
//! A single task owns the state machine, so at most one reconciliation is
//! in flight and the timer needs no locking. Notifications that arrive
//! while a reconciliation runs are queued in the channel and start a new
//! debounce window once it completes.
//!
//! The first reconciliation ([`ChangeScheduler::initial_run`]) happens
//! before watching starts and its failure is returned to the caller, which
//! treats it as fatal. Failures of later runs are logged and the scheduler
//! keeps watching; the agent keeps whatever was last applied.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::ConfigLoader;
use crate::driver::AgentDriver;
use crate::reconciler;
use crate::Result;

/// Quiet period (1000 ms) after the most recent notification before
/// reconciling.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// A change to the watched configuration file. The kind of change is
/// irrelevant; every notification is handled the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeNotification;

/// Scheduler state, see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending.
    Idle,
    /// Debounce timer armed.
    Pending,
    /// Reconciliation in progress.
    Running,
}

/// One full reconciliation: load the configuration and apply it.
pub trait ReconcileJob: Send {
    /// Run the job once.
    ///
    /// # Errors
    ///
    /// Returns whatever the load or the apply failed with.
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// [`ReconcileJob`] that re-reads a config file and reconciles it through
/// an [`AgentDriver`].
pub struct ConfigReconcileJob<L> {
    loader: L,
    path: PathBuf,
    driver: Arc<dyn AgentDriver>,
}

impl<L: ConfigLoader> ConfigReconcileJob<L> {
    /// Create a job for the config file at `path`.
    #[must_use]
    pub fn new(loader: L, path: PathBuf, driver: Arc<dyn AgentDriver>) -> Self {
        Self {
            loader,
            path,
            driver,
        }
    }
}

impl<L: ConfigLoader> ReconcileJob for ConfigReconcileJob<L> {
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let config = self.loader.load(&self.path)?;
            reconciler::reconcile(self.driver.as_ref(), &config).await
        })
    }
}

/// Debounces change notifications into [`ReconcileJob`] runs.
pub struct ChangeScheduler<J> {
    job: J,
    debounce: Duration,
    state: SchedulerState,
    runs: u64,
}

impl<J: ReconcileJob> ChangeScheduler<J> {
    /// Scheduler with the default [`DEBOUNCE_WINDOW`].
    #[must_use]
    pub fn new(job: J) -> Self {
        Self::with_debounce(job, DEBOUNCE_WINDOW)
    }

    /// Scheduler with a custom quiet period.
    #[must_use]
    pub fn with_debounce(job: J, debounce: Duration) -> Self {
        Self {
            job,
            debounce,
            state: SchedulerState::Idle,
            runs: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of reconciliations started, including the initial one.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Perform the startup reconciliation.
    ///
    /// # Errors
    ///
    /// Returns the job's error unchanged. Callers must not start watching
    /// after a failure here.
    pub async fn initial_run(&mut self) -> Result<()> {
        info!("running initial reconciliation");
        self.execute().await
    }

    /// Initial run followed by [`watch`](Self::watch).
    ///
    /// # Errors
    ///
    /// Returns the initial run's error; the watch loop is never entered in
    /// that case.
    pub async fn run(
        &mut self,
        events: mpsc::UnboundedReceiver<ChangeNotification>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.initial_run().await?;
        self.watch(events, cancel).await;
        Ok(())
    }

    /// Debounce `events` into reconciliations until `cancel` fires or the
    /// channel closes.
    ///
    /// A pending window still fires after the channel closes. An in-flight
    /// reconciliation is never interrupted by `cancel`.
    pub async fn watch(
        &mut self,
        mut events: mpsc::UnboundedReceiver<ChangeNotification>,
        cancel: CancellationToken,
    ) {
        let mut deadline: Option<Instant> = None;
        let mut open = true;

        loop {
            self.state = if deadline.is_some() {
                SchedulerState::Pending
            } else {
                SchedulerState::Idle
            };

            if !open && deadline.is_none() {
                debug!("change notifications closed, scheduler exiting");
                break;
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("scheduler cancelled");
                    break;
                }

                event = events.recv(), if open => {
                    if event.is_some() {
                        let rearmed = deadline.is_some();
                        deadline = Some(Instant::now() + self.debounce);
                        debug!(rearmed, "config change noticed, debounce timer armed");
                    } else {
                        open = false;
                    }
                }

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    info!("configuration changed, reconciling");
                    if let Err(err) = self.execute().await {
                        error!(%err, "reload failed; keeping previously applied limits");
                    }
                }
            }
        }

        self.state = SchedulerState::Idle;
    }

    async fn execute(&mut self) -> Result<()> {
        self.state = SchedulerState::Running;
        self.runs += 1;
        let run = self.runs;
        let result = self
            .job
            .run()
            .instrument(info_span!("reconciliation", run))
            .await;
        self.state = SchedulerState::Idle;
        result
    }
}
