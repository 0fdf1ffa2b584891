//! Seam between reconciliation and the agent transport.
//!
//! The [`Reconciler`](crate::reconciler) only needs to push commands; it
//! does not care whether they land on a spawned agent's stdin or a test
//! double. [`AgentDriver`] is that seam, implemented by
//! [`AgentSession`](crate::agent::session::AgentSession).

use std::future::Future;
use std::pin::Pin;

use crate::agent::codec::AgentCommand;
use crate::agent::session::AgentSession;
use crate::Result;

/// Something that accepts agent commands in order.
pub trait AgentDriver: Send + Sync {
    /// Deliver one command.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`](crate::AppError::Protocol) if the
    /// command cannot be encoded and
    /// [`AppError::AgentWrite`](crate::AppError::AgentWrite) if delivery fails.
    fn send(&self, command: AgentCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

impl AgentDriver for AgentSession {
    fn send(&self, command: AgentCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.send_command(command))
    }
}
