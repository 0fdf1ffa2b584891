//! Process lifecycle.
//!
//! Spawns the agent, applies the configuration once, keeps re-applying it on
//! change until shutdown is requested, and always asks the agent to stop on
//! the way out. Once the agent is running, every exit path (clean shutdown,
//! a failed initial reconciliation, a watcher that cannot start) goes through
//! [`stop_agent`] so the agent gets the chance to remove its shaping.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::session::AgentSession;
use crate::agent::spawner::LaunchConfig;
use crate::config::TomlConfigLoader;
use crate::config_watcher::ConfigWatcher;
use crate::discovery::{spawn_discovery, DiscoveryExit};
use crate::driver::AgentDriver;
use crate::scheduler::{ChangeNotification, ChangeScheduler, ConfigReconcileJob};
use crate::Result;

/// How long to wait for the agent to acknowledge `Stop`, and again for it
/// to exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything [`run`] needs besides the shutdown trigger.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Limit configuration file.
    pub config: PathBuf,
    /// Replaces `global.interface` when set.
    pub interface: Option<String>,
    /// How to start the agent.
    pub launch: LaunchConfig,
    /// Poll and log the agent's discovery output.
    pub discovery: bool,
    /// See [`SHUTDOWN_GRACE`].
    pub shutdown_grace: Duration,
}

impl RunOptions {
    /// Options with discovery on and the default grace period.
    #[must_use]
    pub fn new(config: PathBuf, launch: LaunchConfig) -> Self {
        Self {
            config,
            interface: None,
            launch,
            discovery: true,
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }
}

/// Run until `shutdown` resolves, watching the config file with
/// [`ConfigWatcher`].
///
/// # Errors
///
/// - `AppError::AgentSpawn` if the agent cannot be started.
/// - The initial reconciliation's error; the agent is stopped first.
/// - `AppError::Watch` if the file cannot be watched; the agent is stopped
///   first.
pub async fn run<F>(options: RunOptions, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    run_with_watcher(options, shutdown, ConfigWatcher::new).await
}

/// [`run`] with a custom source of change notifications.
///
/// `watch` is called once, after the initial reconciliation succeeded. The
/// guard it returns is kept alive until shutdown.
///
/// # Errors
///
/// Same as [`run`], with `watch`'s error in place of `AppError::Watch`.
pub async fn run_with_watcher<F, W, G>(options: RunOptions, shutdown: F, watch: W) -> Result<()>
where
    F: Future<Output = ()>,
    W: FnOnce(&Path) -> Result<(G, mpsc::UnboundedReceiver<ChangeNotification>)>,
{
    let session = Arc::new(AgentSession::spawn(&options.launch)?);

    let discovery_ct = CancellationToken::new();
    let discovery = options
        .discovery
        .then(|| spawn_discovery(Arc::clone(&session), discovery_ct.clone()));

    let outcome = supervise(&options, &session, shutdown, watch).await;

    stop_agent(&session, discovery, &discovery_ct, options.shutdown_grace).await;
    outcome
}

async fn supervise<F, W, G>(
    options: &RunOptions,
    session: &Arc<AgentSession>,
    shutdown: F,
    watch: W,
) -> Result<()>
where
    F: Future<Output = ()>,
    W: FnOnce(&Path) -> Result<(G, mpsc::UnboundedReceiver<ChangeNotification>)>,
{
    // ── Initial reconciliation ──────────────────────────
    let loader = TomlConfigLoader::new().with_interface_override(options.interface.clone());
    let driver: Arc<dyn AgentDriver> = Arc::clone(session) as Arc<dyn AgentDriver>;
    let job = ConfigReconcileJob::new(loader, options.config.clone(), driver);
    let mut scheduler = ChangeScheduler::new(job);

    if let Err(err) = scheduler.initial_run().await {
        error!(%err, "initial reconciliation failed; shutting down");
        return Err(err);
    }

    // ── Watch for changes ───────────────────────────────
    let (guard, events) = match watch(&options.config) {
        Ok(watching) => watching,
        Err(err) => {
            error!(%err, "cannot watch configuration; shutting down");
            return Err(err);
        }
    };

    let ct = CancellationToken::new();
    let scheduler_ct = ct.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.watch(events, scheduler_ct).await;
    });

    info!(config = %options.config.display(), "limits applied, watching for changes");

    // ── Wait for shutdown ───────────────────────────────
    shutdown.await;
    info!("shutdown requested");
    ct.cancel();
    if let Err(err) = scheduler_handle.await {
        error!(%err, "scheduler task failed");
    }
    drop(guard);

    Ok(())
}

/// Ask the agent to clean up, wait for its acknowledgement, then for exit.
async fn stop_agent(
    session: &AgentSession,
    discovery: Option<JoinHandle<DiscoveryExit>>,
    discovery_ct: &CancellationToken,
    grace: Duration,
) {
    if let Err(err) = session.stop().await {
        warn!(%err, "failed to send stop to agent");
    }

    if let Some(handle) = discovery {
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(exit)) => info!(?exit, "discovery finished"),
            Ok(Err(err)) => error!(%err, "discovery task failed"),
            Err(_elapsed) => {
                warn!("no stop acknowledgement from agent");
                discovery_ct.cancel();
            }
        }
    }

    session.wait_exit(grace).await;
}
