//! Agent-facing message operations: ask, say, prompt, complete, inbox.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use otto_models::{Agent, AgentStatus, Message, MessageFilter, MessageType};
use otto_persistence::Store;
use regex::Regex;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::Result;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9][A-Za-z0-9_-]*)").unwrap())
}

/// Extracts `@name` mentions from message text.
///
/// ```
/// use otto_runtime::bus::parse_mentions;
///
/// let mentions = parse_mentions("ping @authbackend and @ui-2, cc @authbackend");
/// assert_eq!(mentions.into_iter().collect::<Vec<_>>(), vec!["authbackend", "ui-2"]);
/// ```
pub fn parse_mentions(text: &str) -> BTreeSet<String> {
    mention_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Message bus over the shared store.
pub struct MessageBus {
    store: Store,
    config: RuntimeConfig,
}

impl MessageBus {
    pub fn new(store: Store, config: RuntimeConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Posts a question and moves the sender to `waiting`.
    ///
    /// The question and the status change commit together, so an agent that
    /// cannot wait (e.g. `complete`) leaves no question behind.
    pub fn ask(&self, from: &str, text: &str, requires_human: bool) -> Result<Message> {
        let sender = self.sender(from)?;
        let message = Message::builder(from, MessageType::Question, text)
            .mentions(parse_mentions(text))
            .requires_human(requires_human)
            .build();

        match sender {
            Some(_) => {
                self.store.agents().update_status_with_message(
                    from,
                    AgentStatus::Waiting,
                    &message,
                )?;
            }
            None => self.store.messages().create_message(&message)?,
        }
        info!(agent_id = from, message_id = %message.id, requires_human, "question posted");
        Ok(message)
    }

    /// Posts a `say` message, broadcast unless `to` is given.
    pub fn say(&self, from: &str, text: &str, to: Option<&str>) -> Result<Message> {
        self.sender(from)?;
        let mut builder =
            Message::builder(from, MessageType::Say, text).mentions(parse_mentions(text));
        if let Some(to) = to {
            builder = builder.to(to);
        }
        let message = builder.build();
        self.store.messages().create_message(&message)?;
        debug!(agent_id = from, message_id = %message.id, "message posted");
        Ok(message)
    }

    /// Posts a prompt for an existing agent's next turn.
    pub fn prompt(&self, from: &str, to: &str, text: &str) -> Result<Message> {
        self.sender(from)?;
        self.store.agents().get_agent(to)?;

        let message = Message::builder(from, MessageType::Prompt, text)
            .to(to)
            .mentions(parse_mentions(text))
            .build();
        self.store.messages().create_message(&message)?;
        debug!(from, to, message_id = %message.id, "prompt posted");
        Ok(message)
    }

    /// Marks an agent `complete` and posts its `exit` message.
    pub fn complete(&self, agent_id: &str, summary: Option<&str>) -> Result<Message> {
        let content = summary
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} finished", agent_id));
        let message = Message::exit(agent_id, content);
        self.store
            .agents()
            .update_status_with_message(agent_id, AgentStatus::Complete, &message)?;
        info!(agent_id, "agent complete");
        Ok(message)
    }

    /// Returns messages `reader` has not read yet and marks them read.
    ///
    /// `filter` narrows the selection further; its reader is replaced.
    pub fn inbox(&self, reader: &str, filter: MessageFilter) -> Result<Vec<Message>> {
        let filter = filter.unread_by(reader);
        let messages = self.store.messages().list_messages(&filter)?;
        for message in &messages {
            self.store.messages().mark_read(&message.id, reader)?;
        }
        Ok(messages)
    }

    /// All agents, oldest first.
    pub fn status(&self) -> Result<Vec<Agent>> {
        Ok(self.store.agents().list_agents()?)
    }

    /// Checks that `from` may post. Returns the agent record unless `from`
    /// is the orchestrator.
    fn sender(&self, from: &str) -> Result<Option<Agent>> {
        if from == self.config.orchestrator_id {
            return Ok(None);
        }
        Ok(Some(self.store.agents().get_agent(from)?))
    }
}
