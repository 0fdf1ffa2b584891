//! Values reported back by the agent on its output stream.

/// A process the agent saw with network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProcess {
    /// Executable name as reported by the agent.
    pub name: String,
}

/// Result of one [`poll`](crate::agent::session::AgentSession::poll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The agent acknowledged a `Stop` command.
    Stopped,
    /// Zero or more newly discovered processes, in the order reported.
    Discovered(Vec<DiscoveredProcess>),
}
