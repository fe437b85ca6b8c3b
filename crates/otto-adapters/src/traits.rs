//! Core trait for vendor adapters.

use otto_models::Agent;

/// Information about a vendor adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Agent type tag this adapter serves, e.g. "claude".
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Binary to launch.
    pub command: String,
}

/// Session state an adapter launches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRef<'a> {
    /// No session yet.
    None,
    /// Provisional identifier assigned at spawn, not yet reported by the
    /// vendor.
    Placeholder(&'a str),
    /// Identifier reported by the vendor; the session can be resumed.
    Confirmed(&'a str),
}

impl<'a> SessionRef<'a> {
    /// Reads the session state of an agent record.
    pub fn of(agent: &'a Agent) -> Self {
        match agent.session_id.as_deref() {
            None => SessionRef::None,
            Some(id) if agent.session_confirmed => SessionRef::Confirmed(id),
            Some(id) => SessionRef::Placeholder(id),
        }
    }
}

/// Trait for vendor adapters.
///
/// Adapters must be shareable across threads so a single registry can serve
/// concurrent turns.
pub trait AgentAdapter: Send + Sync {
    /// Returns information about this adapter.
    fn info(&self) -> &AdapterInfo;

    /// Returns the command and arguments that run one turn for `prompt`.
    fn launch_command(&self, prompt: &str, session: &SessionRef<'_>) -> (String, Vec<String>);
}
