//! Applies a [`Configuration`] to the agent.
//!
//! A reconciliation is an ordered list of commands:
//!
//! 1. `Interface` (step 0)
//! 2. `Global` (step 1)
//! 3. one `Program` per process spec, in declared order (steps 2 and up)
//!
//! Global limits always precede per-process limits because the agent lets
//! later commands override earlier ones for overlapping scopes. The first
//! failing step aborts the rest; there is no retry and no rollback, so a
//! failure leaves the agent with whatever prefix was applied until the next
//! successful reconciliation.

use tracing::{debug, info, warn};

use crate::agent::codec::AgentCommand;
use crate::config::Configuration;
use crate::driver::AgentDriver;
use crate::{AppError, Result};

/// Commands a reconciliation of `config` sends, in order.
#[must_use]
pub fn plan(config: &Configuration) -> Vec<AgentCommand> {
    let mut commands = Vec::with_capacity(config.processes.len() + 2);
    commands.push(AgentCommand::SetInterface(config.interface.clone()));
    commands.push(AgentCommand::SetGlobalLimit(config.global.clone()));
    commands.extend(
        config
            .processes
            .iter()
            .cloned()
            .map(AgentCommand::SetProcessLimit),
    );
    commands
}

/// Send every command of [`plan`] through `driver`.
///
/// # Errors
///
/// Returns `AppError::Reconcile { step, cause }` for the first command that
/// fails; commands after it are never sent.
pub async fn reconcile(driver: &dyn AgentDriver, config: &Configuration) -> Result<()> {
    let commands = plan(config);
    let total = commands.len();

    for (step, command) in commands.into_iter().enumerate() {
        let kind = command.kind();
        debug!(step, kind, "applying reconciliation step");
        if let Err(cause) = driver.send(command).await {
            warn!(step, kind, %cause, "reconciliation step failed; remaining steps skipped");
            return Err(AppError::Reconcile {
                step,
                cause: Box::new(cause),
            });
        }
    }

    info!(
        interface = %config.interface,
        processes = config.processes.len(),
        steps = total,
        "configuration applied"
    );
    Ok(())
}
