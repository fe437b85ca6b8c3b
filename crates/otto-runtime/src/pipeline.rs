//! One worker turn: prompt in, process output captured, agent finalized.

use std::sync::Arc;

use otto_adapters::{AdapterRegistry, SessionRef};
use otto_models::{
    Agent, AgentStatus, Direction, LogStream, Message, MessageFilter, MessageType,
};
use otto_persistence::{PersistenceError, Store};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::control::{self, ControlEvent};
use crate::error::{Result, RuntimeError};
use crate::runner::{LaunchSpec, ProcessHandle, ProcessRunner, TranscriptChunk};

/// Environment variable carrying the worker's own ID into its process.
pub const AGENT_ID_ENV: &str = "OTTO_AGENT_ID";

/// Outcome of a finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub agent_id: String,
    /// Output chunks logged.
    pub chunks: usize,
    /// Session identifier adopted during the turn, if any.
    pub session_id: Option<String>,
    /// The exit message posted.
    pub exit_message: Message,
}

/// Runs worker turns against a store, a process runner and the vendor
/// adapters.
pub struct TranscriptPipeline {
    store: Store,
    runner: Arc<dyn ProcessRunner>,
    adapters: AdapterRegistry,
    config: RuntimeConfig,
}

impl TranscriptPipeline {
    pub fn new(store: Store, runner: Arc<dyn ProcessRunner>, config: RuntimeConfig) -> Self {
        Self {
            store,
            runner,
            adapters: AdapterRegistry::new(),
            config,
        }
    }

    /// Replaces the adapter registry.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Executes one turn for `agent_id`.
    ///
    /// Resolves the latest unread prompt addressed to the agent, logs it,
    /// starts the vendor process, logs every output chunk, adopts the first
    /// reported session identifier, then marks the agent `complete` and
    /// posts an `exit` message. The process cleanup runs exactly once on
    /// every path, including cancellation of the returned future.
    ///
    /// The prompt is marked read only after the turn is finalized. A turn
    /// that fails before that leaves the prompt pending, so calling
    /// `run_turn` again retries it.
    ///
    /// # Errors
    /// - `InvalidTransition` if the agent is `complete` or `waiting`
    /// - `NoPromptFound` if no unread prompt is addressed to the agent
    /// - any storage failure, after cleanup has run
    pub async fn run_turn(&self, agent_id: &str) -> Result<TurnSummary> {
        let agent = self.store.agents().get_agent(agent_id)?;
        if matches!(agent.status, AgentStatus::Complete | AgentStatus::Waiting) {
            return Err(PersistenceError::InvalidTransition {
                id: agent.id,
                from: agent.status,
                to: AgentStatus::Busy,
            }
            .into());
        }

        let prompt = self.pending_prompt(agent_id)?;
        self.store
            .logs()
            .append(agent_id, Direction::In, LogStream::In, &prompt.content)?;
        debug!(agent_id, message_id = %prompt.id, "prompt logged");

        let spec = self.launch_spec(&agent, &prompt.content)?;
        let ProcessHandle {
            pid,
            chunks,
            cleanup,
        } = self.runner.start(&spec)?;
        info!(agent_id, ?pid, command = %spec.command, "worker started");

        let consumed = self.consume(&agent, chunks).await;
        let released = cleanup.run();

        let (count, session_id) = consumed?;
        if let Err(e) = released {
            warn!(agent_id, error = %e, "worker cleanup failed");
        }

        let exit_message = Message::exit(agent_id, format!("{} finished", agent_id));
        self.store.agents().update_status_with_message(
            agent_id,
            AgentStatus::Complete,
            &exit_message,
        )?;
        self.store.messages().mark_read(&prompt.id, agent_id)?;
        info!(agent_id, chunks = count, "worker complete");

        Ok(TurnSummary {
            agent_id: agent_id.to_string(),
            chunks: count,
            session_id,
            exit_message,
        })
    }

    /// Latest unread prompt addressed to `agent_id`.
    fn pending_prompt(&self, agent_id: &str) -> Result<Message> {
        let filter = MessageFilter::new()
            .of_type(MessageType::Prompt)
            .to(agent_id)
            .unread_by(agent_id);
        self.store
            .messages()
            .list_messages(&filter)?
            .pop()
            .ok_or_else(|| RuntimeError::NoPromptFound {
                agent_id: agent_id.to_string(),
            })
    }

    fn launch_spec(&self, agent: &Agent, prompt: &str) -> Result<LaunchSpec> {
        let adapter = self
            .adapters
            .get(&agent.agent_type)
            .ok_or_else(|| RuntimeError::UnknownAgentType(agent.agent_type.clone()))?;
        let (command, args) = adapter.launch_command(prompt, &SessionRef::of(agent));

        Ok(LaunchSpec::new(command, args)
            .with_env(self.config.extra_env.iter().cloned())
            .with_env([(AGENT_ID_ENV, agent.id.as_str())]))
    }

    /// Logs chunks until the stream closes. Returns the chunk count and the
    /// adopted session identifier.
    async fn consume(
        &self,
        agent: &Agent,
        mut chunks: mpsc::Receiver<TranscriptChunk>,
    ) -> Result<(usize, Option<String>)> {
        let agent_id = agent.id.as_str();
        self.store.agents().update_status(agent_id, AgentStatus::Busy)?;

        let logs = self.store.logs();
        let mut count = 0usize;
        let mut adopted = None;
        let mut seen_control = false;

        while let Some(chunk) = chunks.recv().await {
            logs.append(agent_id, Direction::Out, chunk.stream, &chunk.data)?;
            count += 1;

            if seen_control {
                continue;
            }
            if let Some(ControlEvent::SessionStarted(token)) = control::inspect(&chunk.data) {
                seen_control = true;
                if self.store.agents().update_session_id(agent_id, &token)? {
                    info!(agent_id, session_id = %token, "session adopted");
                    adopted = Some(token);
                }
            }
        }

        Ok((count, adopted))
    }
}
