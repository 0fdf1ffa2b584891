//! Unit tests for reconciliation ordering and failure semantics.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use tc_warden::agent::codec::AgentCommand;
use tc_warden::config::Configuration;
use tc_warden::driver::AgentDriver;
use tc_warden::models::limit::{LimitSpec, MatchRule};
use tc_warden::reconciler::{plan, reconcile};
use tc_warden::{AppError, Result};

/// Records every command it is asked to send; fails the attempt at `fail_at`.
#[derive(Default)]
struct RecordingDriver {
    attempts: Mutex<Vec<AgentCommand>>,
    fail_at: Option<usize>,
}

impl RecordingDriver {
    fn failing_at(step: usize) -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            fail_at: Some(step),
        }
    }

    fn attempts(&self) -> Vec<AgentCommand> {
        self.attempts.lock().unwrap().clone()
    }
}

impl AgentDriver for RecordingDriver {
    fn send(&self, command: AgentCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let mut attempts = self.attempts.lock().unwrap();
        let index = attempts.len();
        attempts.push(command);
        let fail = self.fail_at == Some(index);
        Box::pin(async move {
            if fail {
                Err(AppError::AgentWrite("broken pipe".into()))
            } else {
                Ok(())
            }
        })
    }
}

fn named(name: &str) -> LimitSpec {
    LimitSpec::named(MatchRule::new(vec![name.to_owned()]).unwrap())
}

fn sample_config() -> Configuration {
    Configuration::new(
        "eth0".into(),
        LimitSpec::global().with_download("1000kbps".parse().unwrap()),
        vec![named("chrome").with_upload_minimum("500bps".parse().unwrap())],
    )
    .unwrap()
}

#[test]
fn plan_orders_interface_global_then_processes() {
    let config = Configuration::new(
        "eth0".into(),
        LimitSpec::global(),
        vec![named("a"), named("b"), named("c")],
    )
    .unwrap();

    let kinds: Vec<_> = plan(&config).iter().map(AgentCommand::kind).collect();

    assert_eq!(kinds, ["interface", "global", "program", "program", "program"]);
}

#[test]
fn plan_preserves_declared_process_order() {
    let config = Configuration::new(
        "eth0".into(),
        LimitSpec::global(),
        vec![named("zeta"), named("alpha")],
    )
    .unwrap();

    let names: Vec<_> = plan(&config)
        .into_iter()
        .filter_map(|command| match command {
            AgentCommand::SetProcessLimit(spec) => spec.process_name().map(str::to_owned),
            _ => None,
        })
        .collect();

    assert_eq!(names, ["zeta", "alpha"]);
}

#[tokio::test]
async fn reconcile_sends_every_step_in_order() {
    let driver = RecordingDriver::default();
    let config = sample_config();

    reconcile(&driver, &config).await.expect("reconcile succeeds");

    assert_eq!(driver.attempts(), plan(&config));
}

#[tokio::test]
async fn failure_at_global_step_skips_process_step() {
    let driver = RecordingDriver::failing_at(1);

    let err = reconcile(&driver, &sample_config())
        .await
        .expect_err("step 1 fails");

    assert_eq!(err.failed_step(), Some(1));
    assert!(
        matches!(&err, AppError::Reconcile { cause, .. } if matches!(cause.as_ref(), AppError::AgentWrite(_))),
        "expected write failure as cause, got {err:?}"
    );
    let attempts = driver.attempts();
    assert_eq!(attempts.len(), 2, "process step must not be attempted");
    assert!(matches!(attempts[1], AgentCommand::SetGlobalLimit(_)));
}

#[tokio::test]
async fn failure_at_first_step_reports_step_zero() {
    let driver = RecordingDriver::failing_at(0);

    let err = reconcile(&driver, &sample_config()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(0));
    assert_eq!(driver.attempts().len(), 1);
}

#[tokio::test]
async fn failure_in_process_steps_reports_its_index() {
    let driver = RecordingDriver::failing_at(3);
    let config = Configuration::new(
        "eth0".into(),
        LimitSpec::global(),
        vec![named("a"), named("b"), named("c")],
    )
    .unwrap();

    let err = reconcile(&driver, &config).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(3));
    assert_eq!(driver.attempts().len(), 4);
}
