//! Background task that drains the agent's output.
//!
//! The agent reports every process it sees with network activity as a
//! `ProgramEntry` line and acknowledges `Stop` with a literal `Stop`. This
//! task polls the session in a loop, logs what it learns, and ends when
//! the agent acknowledges a stop or goes away. Keeping the agent's stdout
//! drained also stops it from blocking on a full pipe.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::agent::session::AgentSession;
use crate::models::discovery::PollOutcome;
use crate::AppError;

/// Why the discovery task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryExit {
    /// The agent acknowledged `Stop`.
    StopAcknowledged,
    /// The agent closed its output.
    AgentExited,
    /// Reading from the agent failed.
    ReadFailed(String),
    /// `cancel` fired.
    Cancelled,
}

/// Spawn the discovery loop over `session`.
///
/// Undecodable output is logged and skipped; the loop keeps polling.
#[must_use]
pub fn spawn_discovery(
    session: Arc<AgentSession>,
    cancel: CancellationToken,
) -> JoinHandle<DiscoveryExit> {
    tokio::spawn(run_discovery(session, cancel).instrument(info_span!("discovery")))
}

async fn run_discovery(session: Arc<AgentSession>, cancel: CancellationToken) -> DiscoveryExit {
    loop {
        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                debug!("discovery cancelled");
                return DiscoveryExit::Cancelled;
            }
            outcome = session.poll() => outcome,
        };

        match outcome {
            Ok(PollOutcome::Stopped) => {
                info!("agent acknowledged stop");
                return DiscoveryExit::StopAcknowledged;
            }
            Ok(PollOutcome::Discovered(processes)) => {
                for process in processes {
                    info!(process = %process.name, "agent discovered process");
                }
            }
            Err(AppError::Protocol(msg)) => {
                warn!(error = %msg, "discarding undecodable agent output");
            }
            Err(AppError::AgentExited(msg)) => {
                warn!(reason = %msg, "agent output closed");
                return DiscoveryExit::AgentExited;
            }
            Err(err) => {
                warn!(%err, "reading agent output failed");
                return DiscoveryExit::ReadFailed(err.to_string());
            }
        }
    }
}
