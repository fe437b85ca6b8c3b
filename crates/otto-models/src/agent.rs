//! Agent records and the worker lifecycle state machine.
//!
//! An agent is created once per spawned worker and never deleted. Its status
//! moves forward through the lifecycle below and never leaves `complete`:
//!
//! ```text
//! working ──► busy ──► complete
//!    │  ▲      │  ▲
//!    ▼  │      ▼  │
//!    waiting ◄─┘  │
//!    (ask)        │
//! working ────────┘  (shortcut used by `complete`)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Set at spawn, before any process is launched.
    #[default]
    Working,
    /// The agent's process has been launched.
    Busy,
    /// The agent asked a question and needs an external response.
    Waiting,
    /// The agent's output stream closed. Terminal.
    Complete,
}

impl AgentStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Working,
        AgentStatus::Busy,
        AgentStatus::Waiting,
        AgentStatus::Complete,
    ];

    /// Returns the storage/display name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Working => "working",
            AgentStatus::Busy => "busy",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Complete => "complete",
        }
    }

    /// Returns true for the terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Complete)
    }

    /// Checks whether moving from `self` to `next` is allowed.
    ///
    /// Re-applying the current status is always allowed (idempotent update),
    /// except that nothing leaves `complete`.
    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        use AgentStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Working, Busy)
                | (Working, Waiting)
                | (Working, Complete)
                | (Busy, Waiting)
                | (Busy, Complete)
                | (Waiting, Working)
                | (Waiting, Busy)
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(AgentStatus::Working),
            "busy" => Ok(AgentStatus::Busy),
            "waiting" => Ok(AgentStatus::Waiting),
            "complete" => Ok(AgentStatus::Complete),
            other => Err(format!("unknown agent status: {}", other)),
        }
    }
}

/// A worker (or orchestrator-managed) agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique, stable identifier derived from the task.
    pub id: String,

    /// Vendor tag, e.g. "claude" or "codex".
    #[serde(rename = "type")]
    pub agent_type: String,

    /// Free-text task description.
    pub task: String,

    /// Current lifecycle status.
    pub status: AgentStatus,

    /// Vendor session/thread token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Whether `session_id` was reported by the vendor process.
    ///
    /// While false, `session_id` is the provisional value assigned at
    /// creation and may still be replaced once.
    #[serde(default)]
    pub session_confirmed: bool,

    /// When the agent was created.
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a new agent in the `working` status with no session.
    pub fn new(
        id: impl Into<String>,
        agent_type: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            task: task.into(),
            status: AgentStatus::Working,
            session_id: None,
            session_confirmed: false,
            created_at: Utc::now(),
        }
    }

    /// Sets the provisional session identifier.
    pub fn with_placeholder_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self.session_confirmed = false;
        self
    }

    /// Sets the initial status.
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true while the session identifier can still be replaced.
    pub fn has_placeholder_session(&self) -> bool {
        !self.session_confirmed
    }
}
