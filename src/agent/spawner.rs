//! Agent process spawner.
//!
//! Launches the traffic-control agent through a privilege-escalation
//! launcher (`pkexec` by default) with:
//! - stdin and stdout piped, owned by the resulting session.
//! - stderr inherited, so agent diagnostics land in our own stderr.
//! - `kill_on_drop(true)` so the agent never outlives its session.
//!
//! Spawn failures are final; there is no retry.

use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::info;

use crate::{AppError, Result};

/// Environment variable overriding the agent executable.
pub const AGENT_ENV_VAR: &str = "TC";

/// Agent executable used when [`AGENT_ENV_VAR`] is unset.
pub const DEFAULT_AGENT: &str = "eltrafico-tc";

/// Privilege-escalation launcher used by default.
pub const DEFAULT_LAUNCHER: &str = "pkexec";

/// How to start the agent: `<launcher> <agent>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Privilege-escalation command.
    pub launcher: String,
    /// Agent executable path or name, passed as the launcher's only argument.
    pub agent: String,
}

impl LaunchConfig {
    /// Default launcher with the agent taken from [`AGENT_ENV_VAR`], falling
    /// back to [`DEFAULT_AGENT`].
    #[must_use]
    pub fn from_env() -> Self {
        let agent = std::env::var(AGENT_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT.to_owned());
        Self {
            launcher: DEFAULT_LAUNCHER.to_owned(),
            agent,
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Freshly spawned agent process with its captured streams.
#[derive(Debug)]
pub struct AgentProcess {
    /// Child handle, kept alive so `kill_on_drop` works.
    pub child: Child,
    /// Agent's stdin; commands are written here.
    pub stdin: ChildStdin,
    /// Agent's stdout; discovery output is read from here.
    pub stdout: ChildStdout,
}

/// Spawn the agent described by `config`.
///
/// # Errors
///
/// - `AppError::AgentSpawn("failed to spawn …")`: launcher missing or not
///   executable.
/// - `AppError::AgentSpawn("failed to capture …")`: a pipe was not created.
pub fn spawn_agent(config: &LaunchConfig) -> Result<AgentProcess> {
    let mut child = Command::new(&config.launcher)
        .arg(&config.agent)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            AppError::AgentSpawn(format!(
                "failed to spawn '{} {}': {err}",
                config.launcher, config.agent
            ))
        })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::AgentSpawn("failed to capture agent stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::AgentSpawn("failed to capture agent stdout".into()))?;

    info!(
        launcher = %config.launcher,
        agent = %config.agent,
        pid = ?child.id(),
        "agent process spawned"
    );

    Ok(AgentProcess {
        child,
        stdin,
        stdout,
    })
}
