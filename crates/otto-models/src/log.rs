//! Transcript log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an entry was fed to the agent or produced by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Prompt handed to the agent.
    In,
    /// Output captured from the agent's process (stdout and stderr alike).
    Out,
}

impl Direction {
    /// Returns the storage/display name of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Source stream of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    /// Process standard output.
    Stdout,
    /// Process standard error.
    Stderr,
    /// Conventional tag for inbound (prompt) entries.
    In,
}

impl LogStream {
    /// Returns the storage/display name of this stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
            LogStream::In => "in",
        }
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript line for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Agent the entry belongs to.
    pub agent_id: String,
    /// Prompt-in or process-out.
    pub direction: Direction,
    /// Source stream.
    pub stream: LogStream,
    /// Verbatim content.
    pub content: String,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(
        agent_id: impl Into<String>,
        direction: Direction,
        stream: LogStream,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            direction,
            stream,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::new("w", Direction::Out, LogStream::Stderr, "boom");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["direction"], "out");
        assert_eq!(json["stream"], "stderr");
        assert_eq!(json["content"], "boom");
    }
}
