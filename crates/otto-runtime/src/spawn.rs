//! Registering a new worker and running its first turn.

use otto_models::{Agent, Message};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::{TranscriptPipeline, TurnSummary};

/// What to spawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Vendor tag, e.g. "claude".
    pub agent_type: String,
    /// Task description; the agent ID is derived from it.
    pub task: String,
    /// Files the worker should focus on, as given by the caller.
    pub files: Option<String>,
    /// Extra instructions.
    pub context: Option<String>,
}

impl SpawnRequest {
    pub fn new(agent_type: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: impl Into<String>) -> Self {
        self.files = Some(files.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Builds the first prompt a worker receives.
pub fn build_spawn_prompt(
    agent_id: &str,
    task: &str,
    files: Option<&str>,
    context: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are agent {id}, a worker coordinated by an orchestrator.\n\n## Task\n{task}\n",
        id = agent_id,
        task = task,
    );
    if let Some(files) = files.filter(|f| !f.is_empty()) {
        prompt.push_str(&format!("\n## Files\n{}\n", files));
    }
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\n## Context\n{}\n", context));
    }
    prompt.push_str(&format!(
        "\n## Communication\n\
         - Check messages: otto messages --id {id}\n\
         - Ask for help (you will be paused until answered): otto ask \"<question>\" --id {id}\n\
         - Post an update: otto say \"<update>\" --id {id}\n\
         - When done: otto complete \"<summary>\" --id {id}\n",
        id = agent_id,
    ));
    prompt
}

impl TranscriptPipeline {
    /// Creates a worker for `request` and runs its first turn.
    ///
    /// The worker gets a fresh ID, a provisional session identifier and a
    /// prompt from the orchestrator identity before the turn starts.
    pub async fn spawn(&self, request: &SpawnRequest) -> Result<TurnSummary> {
        let store = self.store();
        let agent_id = store.ids().agent_id(&request.task)?;

        let agent = Agent::new(&agent_id, &request.agent_type, &request.task)
            .with_placeholder_session(Uuid::new_v4().to_string());
        store.agents().create_agent(&agent)?;

        let prompt = build_spawn_prompt(
            &agent_id,
            &request.task,
            request.files.as_deref(),
            request.context.as_deref(),
        );
        store
            .messages()
            .create_message(&Message::prompt(&self.config().orchestrator_id, &agent_id, prompt))?;
        info!(agent_id = %agent_id, agent_type = %request.agent_type, "worker spawned");

        self.run_turn(&agent_id).await
    }
}
