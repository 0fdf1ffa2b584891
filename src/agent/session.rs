//! Agent session: the single owner of the agent process and its streams.
//!
//! Writes go through a [`FramedWrite`] with [`AgentCodec`] behind an async
//! mutex, so concurrent callers never interleave partial lines. Reads go
//! through a separate mutex; [`AgentSession::poll`] neither blocks nor is
//! blocked by writers.
//!
//! # Framing caveat
//!
//! The agent protocol has no length prefix and no end-of-message marker.
//! [`AgentSession::poll`] performs exactly one read and decodes whatever
//! arrived as one complete message. This holds in practice because the
//! agent's messages are small and written in one go, but a large burst of
//! discovery lines may be split across reads (the tail of one read then
//! fails to decode) or several messages may be coalesced into one read (a
//! `Stop` following discovery lines is reported as a protocol violation).
//! Fixing this needs explicit framing on the agent side.

use std::process::ExitStatus;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};

use crate::agent::codec::{self, AgentCodec, AgentCommand};
use crate::agent::spawner::{spawn_agent, LaunchConfig};
use crate::models::discovery::PollOutcome;
use crate::models::limit::LimitSpec;
use crate::{AppError, Result};

/// Size of the buffer handed to the single read in [`AgentSession::poll`].
pub const POLL_BUFFER_BYTES: usize = 64 * 1024;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Live connection to the traffic-control agent.
///
/// Created once at startup and kept for the whole run; configuration errors
/// never recreate it. Dropping the session kills a spawned agent.
pub struct AgentSession {
    writer: Mutex<FramedWrite<BoxedWriter, AgentCodec>>,
    reader: Mutex<BoxedReader>,
    child: Mutex<Option<Child>>,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession").finish_non_exhaustive()
    }
}

impl AgentSession {
    /// Spawn the agent and take ownership of its stdio.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AgentSpawn` if the launcher or agent cannot be
    /// started.
    pub fn spawn(config: &LaunchConfig) -> Result<Self> {
        let process = spawn_agent(config)?;
        let mut session = Self::from_streams(process.stdin, process.stdout);
        session.child = Mutex::new(Some(process.child));
        Ok(session)
    }

    /// Build a session over arbitrary streams with no child process attached.
    ///
    /// `writer` receives encoded commands; `reader` supplies agent output.
    #[must_use]
    pub fn from_streams<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        let reader: BoxedReader = Box::new(reader);
        Self {
            writer: Mutex::new(FramedWrite::new(writer, AgentCodec::new())),
            reader: Mutex::new(reader),
            child: Mutex::new(None),
        }
    }

    /// Encode `command` and write it as one newline-terminated line.
    ///
    /// The writer lock is held for the encode and the write (including the
    /// flush), and released before returning.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol`: the command cannot be encoded; nothing is
    ///   written.
    /// - `AppError::AgentWrite`: the write or flush failed (broken pipe,
    ///   agent exited).
    pub async fn send_command(&self, command: AgentCommand) -> Result<()> {
        let kind = command.kind();
        debug!(kind, ?command, "sending command to agent");

        let mut writer = self.writer.lock().await;
        writer.send(command).await.map_err(|err| match err {
            AppError::Io(msg) => {
                warn!(kind, error = %msg, "write to agent stdin failed");
                AppError::AgentWrite(format!("{kind} command: {msg}"))
            }
            other => other,
        })
    }

    /// Select the interface the agent shapes.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn set_interface(&self, name: &str) -> Result<()> {
        self.send_command(AgentCommand::SetInterface(name.to_owned()))
            .await
    }

    /// Apply interface-wide limits.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn set_global_limit(&self, spec: &LimitSpec) -> Result<()> {
        self.send_command(AgentCommand::SetGlobalLimit(spec.clone()))
            .await
    }

    /// Apply limits for one process.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn set_process_limit(&self, spec: &LimitSpec) -> Result<()> {
        self.send_command(AgentCommand::SetProcessLimit(spec.clone()))
            .await
    }

    /// Ask the agent to remove its shaping and exit.
    ///
    /// The acknowledgement arrives later through [`poll`](Self::poll).
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn stop(&self) -> Result<()> {
        self.send_command(AgentCommand::Stop).await
    }

    /// Perform one read of the agent's output and decode it.
    ///
    /// See the module docs for the single-read framing caveat.
    ///
    /// # Errors
    ///
    /// - `AppError::AgentExited`: the read hit end of stream.
    /// - `AppError::Io`: the read itself failed.
    /// - `AppError::Protocol`: the bytes do not decode.
    pub async fn poll(&self) -> Result<PollOutcome> {
        let mut reader = self.reader.lock().await;
        let mut buf = vec![0_u8; POLL_BUFFER_BYTES];

        let read = reader
            .read(&mut buf)
            .await
            .map_err(|err| AppError::Io(format!("failed to read agent output: {err}")))?;
        if read == 0 {
            return Err(AppError::AgentExited(
                "agent closed its output stream".into(),
            ));
        }

        debug!(bytes = read, "read agent output");
        codec::decode_bytes(&buf[..read])
    }

    /// Wait up to `grace` for a spawned agent to exit, killing it otherwise.
    ///
    /// Returns `None` for sessions without a child process, or when the
    /// agent had to be killed.
    pub async fn wait_exit(&self, grace: Duration) -> Option<ExitStatus> {
        let mut guard = self.child.lock().await;
        let child = guard.as_mut()?;

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "agent process exited");
                Some(status)
            }
            Ok(Err(err)) => {
                warn!(%err, "error waiting for agent process");
                None
            }
            Err(_elapsed) => {
                warn!(?grace, "agent did not exit in time; killing it");
                child.kill().await.ok();
                None
            }
        }
    }
}
