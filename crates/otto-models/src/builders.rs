//! Builder patterns for bus messages.

use chrono::Utc;
use std::collections::BTreeSet;

use crate::ids::MessageId;
use crate::message::{Message, MessageType};

/// Builder for creating Message instances with a fluent API.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from_id: String,
    message_type: MessageType,
    content: String,
    to_id: Option<String>,
    mentions: BTreeSet<String>,
    requires_human: bool,
    id: Option<MessageId>,
}

impl MessageBuilder {
    /// Creates a new MessageBuilder with required fields.
    pub fn new(
        from_id: impl Into<String>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            message_type,
            content: content.into(),
            to_id: None,
            mentions: BTreeSet::new(),
            requires_human: false,
            id: None,
        }
    }

    /// Directs the message at one recipient.
    pub fn to(mut self, to_id: impl Into<String>) -> Self {
        self.to_id = Some(to_id.into());
        self
    }

    /// Adds a single mention.
    pub fn mention(mut self, agent_id: impl Into<String>) -> Self {
        self.mentions.insert(agent_id.into());
        self
    }

    /// Adds several mentions.
    pub fn mentions<I, S>(mut self, agent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mentions.extend(agent_ids.into_iter().map(Into::into));
        self
    }

    /// Flags the message as needing a human.
    pub fn requires_human(mut self, requires_human: bool) -> Self {
        self.requires_human = requires_human;
        self
    }

    /// Uses a fixed ID instead of a random one.
    pub fn id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builds the Message.
    pub fn build(self) -> Message {
        Message {
            id: self.id.unwrap_or_default(),
            from_id: self.from_id,
            to_id: self.to_id,
            message_type: self.message_type,
            content: self.content,
            mentions: self.mentions,
            requires_human: self.requires_human,
            read_by: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// Convenience methods on Message for creating builders.
impl Message {
    /// Creates a builder for a new message.
    pub fn builder(
        from_id: impl Into<String>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> MessageBuilder {
        MessageBuilder::new(from_id, message_type, content)
    }

    /// Creates a prompt directed at a worker.
    pub fn prompt(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        MessageBuilder::new(from_id, MessageType::Prompt, content)
            .to(to_id)
            .build()
    }

    /// Creates the broadcast posted when a worker turn ends.
    pub fn exit(from_id: impl Into<String>, content: impl Into<String>) -> Self {
        MessageBuilder::new(from_id, MessageType::Exit, content).build()
    }
}
