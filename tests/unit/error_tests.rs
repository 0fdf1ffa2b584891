//! Unit tests for `AppError` display format and error behavior.

use std::error::Error;

use tc_warden::AppError;

#[test]
fn display_is_prefixed_by_kind() {
    assert_eq!(
        AppError::AgentSpawn("no pkexec".into()).to_string(),
        "agent spawn: no pkexec"
    );
    assert_eq!(
        AppError::AgentWrite("broken pipe".into()).to_string(),
        "agent write: broken pipe"
    );
    assert_eq!(
        AppError::Protocol("bad line".into()).to_string(),
        "protocol: bad line"
    );
    assert_eq!(AppError::Config("bad".into()).to_string(), "config: bad");
}

#[test]
fn reconcile_error_names_step_and_cause() {
    let err = AppError::Reconcile {
        step: 1,
        cause: Box::new(AppError::AgentWrite("broken pipe".into())),
    };
    assert_eq!(
        err.to_string(),
        "reconcile: step 1 failed: agent write: broken pipe"
    );
    assert_eq!(err.failed_step(), Some(1));
}

#[test]
fn reconcile_error_exposes_cause_as_source() {
    let err = AppError::Reconcile {
        step: 3,
        cause: Box::new(AppError::Protocol("newline".into())),
    };
    let source = err.source().expect("source present");
    assert_eq!(source.to_string(), "protocol: newline");
}

#[test]
fn other_errors_have_no_step_or_source() {
    let err = AppError::Watch("inotify limit".into());
    assert_eq!(err.failed_step(), None);
    assert!(err.source().is_none());
}

#[test]
fn io_errors_convert_to_io_variant() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Io(ref msg) if msg.contains("pipe closed")));
}

#[test]
fn error_messages_have_no_trailing_period() {
    let err = AppError::AgentExited("agent closed its output stream".into());
    assert!(!err.to_string().ends_with('.'));
}
