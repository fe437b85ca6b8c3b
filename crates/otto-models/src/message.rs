//! Bus messages exchanged between agents.
//!
//! A message is immutable once created except for its read-by set, which
//! only ever grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::ids::MessageId;

/// Kind of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Status update or chatter.
    Say,
    /// A question; the sender is waiting for an answer.
    Question,
    /// Instructions directed at a worker, consumed by its next turn.
    Prompt,
    /// Posted when a worker turn finishes.
    Exit,
}

impl MessageType {
    /// Returns the storage/display name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Say => "say",
            MessageType::Question => "question",
            MessageType::Prompt => "prompt",
            MessageType::Exit => "exit",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "say" => Ok(MessageType::Say),
            "question" => Ok(MessageType::Question),
            "prompt" => Ok(MessageType::Prompt),
            "exit" => Ok(MessageType::Exit),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// A message on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message.
    pub id: MessageId,

    /// Sender agent ID (or the orchestrator identity).
    pub from_id: String,

    /// Recipient agent ID. `None` means broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_id: Option<String>,

    /// Kind of message.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Message text.
    pub content: String,

    /// Agent IDs referenced in the content.
    #[serde(default)]
    pub mentions: BTreeSet<String>,

    /// Whether a human has to act on this message.
    #[serde(default)]
    pub requires_human: bool,

    /// Readers that have consumed this message.
    #[serde(default)]
    pub read_by: BTreeSet<String>,

    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new broadcast message with no mentions.
    pub fn new(
        from_id: impl Into<String>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            from_id: from_id.into(),
            to_id: None,
            message_type,
            content: content.into(),
            mentions: BTreeSet::new(),
            requires_human: false,
            read_by: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Returns true if the message has no recipient.
    pub fn is_broadcast(&self) -> bool {
        self.to_id.is_none()
    }

    /// Returns true if `reader` has consumed this message.
    pub fn is_read_by(&self, reader: &str) -> bool {
        self.read_by.contains(reader)
    }

    /// Returns true if `agent_id` is mentioned.
    pub fn mentions(&self, agent_id: &str) -> bool {
        self.mentions.contains(agent_id)
    }

    /// Adds `reader` to the read-by set. Returns false if it was already there.
    pub fn mark_read(&mut self, reader: impl Into<String>) -> bool {
        self.read_by.insert(reader.into())
    }
}

/// Query over stored messages.
///
/// Every set field narrows the result. `reader_id` excludes messages the
/// reader has already consumed. `limit` caps the count after ordering and
/// filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    /// Exact message type.
    pub message_type: Option<MessageType>,
    /// Exact sender.
    pub from_id: Option<String>,
    /// Exact recipient (broadcasts never match).
    pub to_id: Option<String>,
    /// Must be present in the mentions set.
    pub mention: Option<String>,
    /// Must be absent from the read-by set.
    pub reader_id: Option<String>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl MessageFilter {
    /// Creates an empty filter that matches every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one message type.
    pub fn of_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    /// Restricts to one sender.
    pub fn from(mut self, from_id: impl Into<String>) -> Self {
        self.from_id = Some(from_id.into());
        self
    }

    /// Restricts to messages directed at one recipient.
    pub fn to(mut self, to_id: impl Into<String>) -> Self {
        self.to_id = Some(to_id.into());
        self
    }

    /// Restricts to messages mentioning an agent.
    pub fn mentioning(mut self, agent_id: impl Into<String>) -> Self {
        self.mention = Some(agent_id.into());
        self
    }

    /// Restricts to messages the reader has not consumed.
    pub fn unread_by(mut self, reader_id: impl Into<String>) -> Self {
        self.reader_id = Some(reader_id.into());
        self
    }

    /// Caps the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the per-message predicates (everything except `limit`).
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(message_type) = self.message_type {
            if message.message_type != message_type {
                return false;
            }
        }
        if let Some(from_id) = &self.from_id {
            if &message.from_id != from_id {
                return false;
            }
        }
        if let Some(to_id) = &self.to_id {
            if message.to_id.as_ref() != Some(to_id) {
                return false;
            }
        }
        if let Some(mention) = &self.mention {
            if !message.mentions(mention) {
                return false;
            }
        }
        if let Some(reader_id) = &self.reader_id {
            if message.is_read_by(reader_id) {
                return false;
            }
        }
        true
    }
}
