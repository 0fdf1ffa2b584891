//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// The launcher or agent executable could not be started.
    AgentSpawn(String),
    /// A command could not be written to the agent's stdin.
    AgentWrite(String),
    /// The agent closed its output stream.
    AgentExited(String),
    /// Malformed agent output, or a command that cannot be framed as one line.
    Protocol(String),
    /// Configuration reading, parsing, or validation failure.
    Config(String),
    /// A reconciliation step failed; later steps were not attempted.
    Reconcile {
        /// Zero-based index of the failed step.
        step: usize,
        /// Underlying failure.
        cause: Box<AppError>,
    },
    /// The configuration file watcher could not be set up.
    Watch(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Step index of a reconciliation failure, if this is one.
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            Self::Reconcile { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgentSpawn(msg) => write!(f, "agent spawn: {msg}"),
            Self::AgentWrite(msg) => write!(f, "agent write: {msg}"),
            Self::AgentExited(msg) => write!(f, "agent exited: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Reconcile { step, cause } => {
                write!(f, "reconcile: step {step} failed: {cause}")
            }
            Self::Watch(msg) => write!(f, "watch: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reconcile { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
