//! Traffic-control agent process handling.
//!
//! The agent is an external privileged executable that performs the actual
//! traffic shaping. It is driven through a line protocol on its stdio:
//!
//! - `codec`: encodes [`AgentCommand`](codec::AgentCommand)s into lines and
//!   decodes the agent's discovery / stop-acknowledgement output.
//! - `spawner`: launches the agent through a privilege-escalation launcher.
//! - `session`: owns the child process and its streams; the only place that
//!   writes to or reads from them.

pub mod codec;
pub mod session;
pub mod spawner;
