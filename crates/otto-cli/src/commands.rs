//! Command handlers for CLI subcommands.

use std::sync::Arc;

use otto_models::{
    Agent, Direction, LogEntry, Message, MessageFilter, MessageType, Task, TaskFilter, TaskUpdate,
};
use otto_persistence::Store;
use otto_runtime::{
    control, MessageBus, RuntimeConfig, SpawnRequest, TokioProcessRunner, TranscriptPipeline,
    TurnSummary,
};
use tracing::info;

use crate::cli::{Commands, OutputFormat, TaskCommands};

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub fn execute(command: Commands, config: &RuntimeConfig) -> Result<()> {
    let store = config.open_store()?;
    let bus = MessageBus::new(store.clone(), config.clone());

    match command {
        Commands::Ask {
            question,
            id,
            human,
        } => {
            let msg = bus.ask(&id, &question, human)?;
            println!("{} is waiting ({})", id, msg.id);
            Ok(())
        }
        Commands::Say { message, id, to } => {
            let msg = bus.say(&id, &message, to.as_deref())?;
            println!("{}", msg.id);
            Ok(())
        }
        Commands::Prompt { agent, message } => {
            let msg = bus.prompt(&config.orchestrator_id, &agent, &message)?;
            println!("{}", msg.id);
            Ok(())
        }
        Commands::Complete { summary, id } => {
            bus.complete(&id, summary.as_deref())?;
            println!("{} complete", id);
            Ok(())
        }
        Commands::Status { format } => cmd_status(&bus, format),
        Commands::Messages {
            id,
            message_type,
            from,
            mention,
            limit,
            all,
        } => {
            let reader = id.unwrap_or_else(|| config.orchestrator_id.clone());
            let filter = MessageFilter {
                message_type,
                from_id: from,
                mention,
                limit,
                ..Default::default()
            };
            cmd_messages(&bus, &reader, filter, all)
        }
        Commands::Log {
            agent,
            tail,
            direction,
            raw,
        } => cmd_log(&store, &agent, tail, direction, raw),
        Commands::Spawn {
            agent_type,
            task,
            files,
            context,
        } => {
            let request = SpawnRequest {
                agent_type,
                task,
                files,
                context,
            };
            let summary = block_on(pipeline(store, config).spawn(&request))??;
            print_turn(&summary);
            Ok(())
        }
        Commands::WorkerSpawn { agent } => {
            let summary = block_on(pipeline(store, config).run_turn(&agent))??;
            print_turn(&summary);
            Ok(())
        }
        Commands::Task { command } => cmd_task(&store, command),
    }
}

fn pipeline(store: Store, config: &RuntimeConfig) -> TranscriptPipeline {
    let runner = Arc::new(TokioProcessRunner::new(config.channel_capacity));
    TranscriptPipeline::new(store, runner, config.clone())
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new()?;
    Ok(runtime.block_on(future))
}

fn print_turn(summary: &TurnSummary) {
    println!("{}: {} output lines", summary.agent_id, summary.chunks);
    if let Some(session_id) = &summary.session_id {
        println!("  Session: {}", session_id);
    }
}

fn cmd_status(bus: &MessageBus, format: OutputFormat) -> Result<()> {
    let agents = bus.status()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&agents)?),
        OutputFormat::Table => {
            if agents.is_empty() {
                println!("No agents.");
            }
            for agent in &agents {
                println!("{}", format_agent(agent));
            }
        }
    }
    Ok(())
}

fn cmd_messages(bus: &MessageBus, reader: &str, filter: MessageFilter, all: bool) -> Result<()> {
    let messages = if all {
        bus.store().messages().list_messages(&filter)?
    } else {
        bus.inbox(reader, filter)?
    };
    info!(reader, count = messages.len(), "messages read");

    for msg in &messages {
        println!("{}", format_message(msg));
    }
    Ok(())
}

fn cmd_log(
    store: &Store,
    agent: &str,
    tail: Option<usize>,
    direction: Option<Direction>,
    raw: bool,
) -> Result<()> {
    store.agents().get_agent(agent)?;
    let mut entries = store.logs().list(agent, direction)?;
    if let Some(n) = tail {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    for entry in &entries {
        println!("{}", format_log_entry(entry, raw));
    }
    Ok(())
}

fn cmd_task(store: &Store, command: TaskCommands) -> Result<()> {
    let tasks = store.tasks();
    match command {
        TaskCommands::Create {
            title,
            parent,
            notes,
            repo,
            branch,
        } => {
            let repo = match repo {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            if let Some(parent) = &parent {
                tasks.get_task(parent)?;
            }

            let mut task = Task::new(
                store.ids().task_id()?,
                title,
                repo.to_string_lossy(),
                branch,
            );
            task.parent_id = parent;
            task.notes = notes;
            tasks.create_task(&task)?;
            println!("{}", task.id);
        }
        TaskCommands::Show { id } => {
            let task = tasks.get_task(&id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskCommands::Update {
            id,
            title,
            status,
            notes,
        } => {
            let update = TaskUpdate {
                title,
                status,
                notes,
            };
            if update.is_empty() {
                return Err("nothing to update: pass --title, --status or --notes".into());
            }
            let task = tasks.update_task(&id, &update)?;
            println!("{}", format_task(&task));
        }
        TaskCommands::Delete { id } => {
            tasks.delete_task(&id)?;
            println!("deleted {}", id);
        }
        TaskCommands::List {
            parent,
            all,
            format,
        } => {
            let filter = TaskFilter {
                parent_id: parent,
                include_deleted: all,
                ..Default::default()
            };
            let list = tasks.list_tasks(&filter)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                OutputFormat::Table => {
                    for task in &list {
                        println!("{}", format_task(task));
                    }
                }
            }
        }
    }
    Ok(())
}

/// `id [type]: status - task`
pub fn format_agent(agent: &Agent) -> String {
    format!(
        "{} [{}]: {} - {}",
        agent.id, agent.agent_type, agent.status, agent.task
    )
}

/// One-line rendering of a bus message.
pub fn format_message(msg: &Message) -> String {
    let target = match &msg.to_id {
        Some(to) => format!(" -> {}", to),
        None => String::new(),
    };
    let flag = if msg.requires_human { " [human]" } else { "" };
    let kind = match msg.message_type {
        MessageType::Say => String::new(),
        other => format!(" ({})", other),
    };
    format!(
        "[{}] {}{}{}{}: {}",
        msg.created_at.format("%H:%M:%S"),
        msg.from_id,
        target,
        kind,
        flag,
        msg.content
    )
}

/// One-line rendering of a transcript entry.
pub fn format_log_entry(entry: &LogEntry, raw: bool) -> String {
    let content = if raw {
        entry.content.clone()
    } else {
        control::summarize(&entry.content).unwrap_or_else(|| entry.content.clone())
    };
    let arrow = match entry.direction {
        Direction::In => ">>",
        Direction::Out => "<<",
    };
    format!("{} {} {}", arrow, entry.stream, content)
}

fn format_task(task: &Task) -> String {
    let deleted = if task.is_deleted() { " (deleted)" } else { "" };
    format!("{} [{}] {}{}", task.id, task.status, task.title, deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_models::{AgentStatus, LogStream, TaskStatus};
    use tempfile::TempDir;

    fn config() -> (TempDir, RuntimeConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::new()
            .with_state_dir(dir.path())
            .with_map_size_mb(16);
        (dir, config)
    }

    #[test]
    fn test_format_agent() {
        let agent = Agent::new("authbackend", "claude", "auth backend")
            .with_status(AgentStatus::Busy);
        assert_eq!(
            format_agent(&agent),
            "authbackend [claude]: busy - auth backend"
        );
    }

    #[test]
    fn test_format_message() {
        let msg = Message::builder("a", MessageType::Question, "help?")
            .to("b")
            .requires_human(true)
            .build();
        let line = format_message(&msg);
        assert!(line.ends_with("a -> b (question) [human]: help?"));
    }

    #[test]
    fn test_format_log_entry_renders_assistant_records() {
        let entry = LogEntry::new(
            "w",
            Direction::Out,
            LogStream::Stdout,
            r#"{"type":"assistant","message":{"content":"hello"}}"#,
        );
        assert_eq!(format_log_entry(&entry, false), "<< stdout hello");
        assert!(format_log_entry(&entry, true).contains("\"assistant\""));
    }

    #[test]
    fn test_ask_and_complete_round() {
        let (_dir, config) = config();
        let store = config.open_store().unwrap();
        store
            .agents()
            .create_agent(&Agent::new("a", "claude", "task"))
            .unwrap();
        drop(store);

        execute(
            Commands::Ask {
                question: "need input".into(),
                id: "a".into(),
                human: false,
            },
            &config,
        )
        .unwrap();

        let store = config.open_store().unwrap();
        assert_eq!(
            store.agents().get_agent("a").unwrap().status,
            AgentStatus::Waiting
        );
        drop(store);

        // Waiting agents cannot complete directly.
        assert!(execute(
            Commands::Complete {
                summary: None,
                id: "a".into()
            },
            &config
        )
        .is_err());
    }

    #[test]
    fn test_task_lifecycle() {
        let (_dir, config) = config();

        execute(
            Commands::Task {
                command: TaskCommands::Create {
                    title: "Auth".into(),
                    parent: None,
                    notes: None,
                    repo: Some("/repo".into()),
                    branch: "main".into(),
                },
            },
            &config,
        )
        .unwrap();

        let store = config.open_store().unwrap();
        let tasks = store.tasks().list_tasks(&TaskFilter::default()).unwrap();
        assert_eq!(tasks.len(), 1);
        let id = tasks[0].id.clone();
        drop(store);

        execute(
            Commands::Task {
                command: TaskCommands::Update {
                    id: id.clone(),
                    title: None,
                    status: Some(TaskStatus::Closed),
                    notes: None,
                },
            },
            &config,
        )
        .unwrap();
        execute(
            Commands::Task {
                command: TaskCommands::Delete { id: id.clone() },
            },
            &config,
        )
        .unwrap();

        let store = config.open_store().unwrap();
        let task = store.tasks().get_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Closed);
        assert!(task.is_deleted());
    }

    #[test]
    fn test_empty_task_update_rejected() {
        let (_dir, config) = config();
        let result = execute(
            Commands::Task {
                command: TaskCommands::Update {
                    id: "t-00000".into(),
                    title: None,
                    status: None,
                    notes: None,
                },
            },
            &config,
        );
        assert!(result.is_err());
    }
}
