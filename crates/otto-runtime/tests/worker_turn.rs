//! End-to-end worker turns against a real store and a scripted runner.

use std::sync::Arc;
use std::time::Duration;

use otto_models::{Agent, AgentStatus, Direction, LogStream, Message, MessageFilter, MessageType};
use otto_persistence::{PersistenceError, Store};
use otto_runtime::testing::ScriptedRunner;
use otto_runtime::{
    MessageBus, RuntimeConfig, RuntimeError, SpawnRequest, TranscriptChunk, TranscriptPipeline,
};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    store: Store,
    runner: ScriptedRunner,
    pipeline: TranscriptPipeline,
}

fn harness(runner: ScriptedRunner) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path(), 32).unwrap();
    let pipeline = TranscriptPipeline::new(
        store.clone(),
        Arc::new(runner.clone()),
        RuntimeConfig::new(),
    );
    Harness {
        _dir: dir,
        store,
        runner,
        pipeline,
    }
}

impl Harness {
    fn add_worker(&self, agent: Agent, prompt: &str) {
        let id = agent.id.clone();
        self.store.agents().create_agent(&agent).unwrap();
        self.store
            .messages()
            .create_message(&Message::prompt("orchestrator", id, prompt))
            .unwrap();
    }

    fn unread_prompts(&self, agent_id: &str) -> Vec<Message> {
        self.store
            .messages()
            .list_messages(
                &MessageFilter::new()
                    .of_type(MessageType::Prompt)
                    .to(agent_id)
                    .unread_by(agent_id),
            )
            .unwrap()
    }

    fn exits_from(&self, agent_id: &str) -> Vec<Message> {
        self.store
            .messages()
            .list_messages(
                &MessageFilter::new()
                    .of_type(MessageType::Exit)
                    .from(agent_id),
            )
            .unwrap()
    }
}

#[tokio::test]
async fn ask_then_worker_turn() {
    let h = harness(ScriptedRunner::from_lines(&["out:line1", "err:line2"]));

    // Agent A asks and starts waiting.
    h.store
        .agents()
        .create_agent(&Agent::new("a", "claude", "design api"))
        .unwrap();
    let bus = MessageBus::new(h.store.clone(), RuntimeConfig::new());
    bus.ask("a", "need input", false).unwrap();

    assert_eq!(
        h.store.agents().get_agent("a").unwrap().status,
        AgentStatus::Waiting
    );
    let questions = h
        .store
        .messages()
        .list_messages(&MessageFilter::new().of_type(MessageType::Question).from("a"))
        .unwrap();
    assert_eq!(questions.len(), 1);

    // Agent B runs one turn.
    h.add_worker(
        Agent::new("b", "claude", "build it").with_status(AgentStatus::Busy),
        "do X",
    );
    let summary = h.pipeline.run_turn("b").await.unwrap();
    assert_eq!(summary.chunks, 2);

    let inbound = h.store.logs().list("b", Some(Direction::In)).unwrap();
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].content, "do X");
    assert_eq!(inbound[0].stream, LogStream::In);

    let outbound = h.store.logs().list("b", Some(Direction::Out)).unwrap();
    let lines: Vec<_> = outbound
        .iter()
        .map(|e| (e.stream, e.content.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![(LogStream::Stdout, "line1"), (LogStream::Stderr, "line2")]
    );

    assert_eq!(
        h.store.agents().get_agent("b").unwrap().status,
        AgentStatus::Complete
    );
    let exits = h.exits_from("b");
    assert_eq!(exits.len(), 1);
    assert!(exits[0].is_broadcast());
    assert!(!exits[0].requires_human);

    assert_eq!(h.runner.cleanup_count(), 1);
    // A is untouched by B's turn.
    assert_eq!(
        h.store.agents().get_agent("a").unwrap().status,
        AgentStatus::Waiting
    );
}

#[tokio::test]
async fn zero_chunks_still_completes() {
    let h = harness(ScriptedRunner::new(vec![]));
    h.add_worker(Agent::new("w", "codex", "noop"), "nothing to say");

    let summary = h.pipeline.run_turn("w").await.unwrap();

    assert_eq!(summary.chunks, 0);
    assert_eq!(h.store.logs().list("w", None).unwrap().len(), 1);
    assert_eq!(
        h.store.agents().get_agent("w").unwrap().status,
        AgentStatus::Complete
    );
    assert_eq!(h.exits_from("w").len(), 1);
    assert_eq!(h.runner.cleanup_count(), 1);
}

#[tokio::test]
async fn first_session_event_is_adopted() {
    let h = harness(ScriptedRunner::new(vec![
        TranscriptChunk::stdout("not json"),
        TranscriptChunk::stdout(r#"{"type":"thread.started","thread_id":"thread-1"}"#),
        TranscriptChunk::stdout(r#"{"type":"thread.started","thread_id":"thread-2"}"#),
        TranscriptChunk::stderr("{broken"),
    ]));
    h.add_worker(
        Agent::new("w", "codex", "task").with_placeholder_session("placeholder"),
        "go",
    );

    let summary = h.pipeline.run_turn("w").await.unwrap();

    assert_eq!(summary.session_id.as_deref(), Some("thread-1"));
    let agent = h.store.agents().get_agent("w").unwrap();
    assert_eq!(agent.session_id.as_deref(), Some("thread-1"));
    assert!(agent.session_confirmed);
    // Control lines are logged verbatim like everything else.
    assert_eq!(h.store.logs().list("w", Some(Direction::Out)).unwrap().len(), 4);
}

#[tokio::test]
async fn no_session_event_keeps_placeholder() {
    let h = harness(ScriptedRunner::from_lines(&["out:hello"]));
    h.add_worker(
        Agent::new("w", "claude", "task").with_placeholder_session("placeholder"),
        "go",
    );

    let summary = h.pipeline.run_turn("w").await.unwrap();

    assert_eq!(summary.session_id, None);
    let agent = h.store.agents().get_agent("w").unwrap();
    assert_eq!(agent.session_id.as_deref(), Some("placeholder"));
    assert!(!agent.session_confirmed);
}

#[tokio::test]
async fn complete_agent_is_rejected_without_side_effects() {
    let h = harness(ScriptedRunner::from_lines(&["out:x"]));
    h.add_worker(
        Agent::new("w", "claude", "task").with_status(AgentStatus::Complete),
        "again",
    );

    let err = h.pipeline.run_turn("w").await.unwrap_err();

    assert!(err.is_invalid_transition());
    assert!(h.store.logs().list("w", None).unwrap().is_empty());
    assert!(h.runner.launches().is_empty());
    assert!(h.exits_from("w").is_empty());
}

#[tokio::test]
async fn waiting_agent_is_rejected() {
    let h = harness(ScriptedRunner::new(vec![]));
    h.add_worker(
        Agent::new("w", "claude", "task").with_status(AgentStatus::Waiting),
        "go",
    );

    let err = h.pipeline.run_turn("w").await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn missing_prompt_is_an_error() {
    let h = harness(ScriptedRunner::new(vec![]));
    h.store
        .agents()
        .create_agent(&Agent::new("w", "claude", "task"))
        .unwrap();
    // A broadcast and a prompt for someone else do not count.
    h.store
        .messages()
        .create_message(&Message::builder("orchestrator", MessageType::Prompt, "hi").build())
        .unwrap();
    h.store
        .messages()
        .create_message(&Message::prompt("orchestrator", "other", "not yours"))
        .unwrap();

    let err = h.pipeline.run_turn("w").await.unwrap_err();

    assert!(matches!(err, RuntimeError::NoPromptFound { ref agent_id } if agent_id == "w"));
    assert!(h.store.logs().list("w", None).unwrap().is_empty());
    assert_eq!(
        h.store.agents().get_agent("w").unwrap().status,
        AgentStatus::Working
    );
}

#[tokio::test]
async fn consumed_prompt_is_not_replayed() {
    let h = harness(ScriptedRunner::new(vec![]));
    h.add_worker(Agent::new("w", "claude", "task"), "once");

    h.pipeline.run_turn("w").await.unwrap();

    assert!(h.unread_prompts("w").is_empty());
}

#[tokio::test]
async fn cancelled_turn_still_cleans_up() {
    let h = harness(ScriptedRunner::from_lines(&["out:partial"]).hanging());
    h.add_worker(Agent::new("w", "claude", "task"), "go");

    let result = tokio::time::timeout(Duration::from_millis(200), h.pipeline.run_turn("w")).await;

    assert!(result.is_err());
    assert_eq!(h.runner.cleanup_count(), 1);
    // The turn never finished.
    assert_eq!(
        h.store.agents().get_agent("w").unwrap().status,
        AgentStatus::Busy
    );
    assert!(h.exits_from("w").is_empty());
    assert_eq!(h.unread_prompts("w").len(), 1);
}

#[tokio::test]
async fn storage_failure_mid_stream_is_surfaced_after_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    // One oversized chunk cannot fit in a 1 MB map.
    let store = Store::open(dir.path(), 1).unwrap();
    let oversized = ScriptedRunner::new(vec![
        TranscriptChunk::stdout("first"),
        TranscriptChunk::stdout("x".repeat(4 * 1024 * 1024)),
        TranscriptChunk::stdout("never logged"),
    ]);
    let h = Harness {
        pipeline: TranscriptPipeline::new(
            store.clone(),
            Arc::new(oversized.clone()),
            RuntimeConfig::new(),
        ),
        _dir: dir,
        store,
        runner: oversized,
    };
    h.add_worker(Agent::new("w", "claude", "task"), "do X");

    let err = h.pipeline.run_turn("w").await.unwrap_err();

    assert!(matches!(
        err,
        RuntimeError::Persistence(PersistenceError::Storage(_))
    ));
    assert_eq!(h.runner.cleanup_count(), 1);
    assert!(h.exits_from("w").is_empty());
    assert_ne!(
        h.store.agents().get_agent("w").unwrap().status,
        AgentStatus::Complete
    );
    let outbound = h.store.logs().list("w", Some(Direction::Out)).unwrap();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].content, "first");

    // The prompt is still pending, so the whole turn can be retried.
    assert_eq!(h.unread_prompts("w").len(), 1);
    let runner = ScriptedRunner::from_lines(&["out:ok"]);
    let retry = TranscriptPipeline::new(
        h.store.clone(),
        Arc::new(runner.clone()),
        RuntimeConfig::new(),
    );
    let summary = retry.run_turn("w").await.unwrap();

    assert_eq!(summary.chunks, 1);
    assert_eq!(runner.launches()[0].args[1], "do X");
    assert_eq!(
        h.store.agents().get_agent("w").unwrap().status,
        AgentStatus::Complete
    );
    assert_eq!(h.exits_from("w").len(), 1);
    assert!(h.unread_prompts("w").is_empty());
}

#[tokio::test]
async fn spawn_registers_and_runs_worker() {
    let h = harness(ScriptedRunner::from_lines(&[
        r#"out:{"type":"system","subtype":"init","session_id":"sess-42"}"#,
        "out:working on it",
    ]));

    let summary = h
        .pipeline
        .spawn(&SpawnRequest::new("claude", "auth backend").with_files("auth.rs"))
        .await
        .unwrap();

    assert_eq!(summary.agent_id, "authbackend");
    let agent = h.store.agents().get_agent("authbackend").unwrap();
    assert_eq!(agent.status, AgentStatus::Complete);
    assert_eq!(agent.session_id.as_deref(), Some("sess-42"));

    let launch = &h.runner.launches()[0];
    assert_eq!(launch.command, "claude");
    assert_eq!(launch.args[2], "--session-id");

    let inbound = h
        .store
        .logs()
        .list("authbackend", Some(Direction::In))
        .unwrap();
    assert!(inbound[0].content.contains("otto messages --id authbackend"));
    assert!(inbound[0].content.contains("auth.rs"));

    // Same task again gets a suffixed ID.
    let second = h
        .pipeline
        .spawn(&SpawnRequest::new("claude", "auth backend"))
        .await
        .unwrap();
    assert_eq!(second.agent_id, "authbackend-2");
}
