//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use otto_models::{Direction, MessageType, TaskStatus};
use otto_runtime::RuntimeConfig;

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// Otto - coordinate coding agents through a shared message bus
#[derive(Parser, Debug)]
#[command(name = "otto")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "OTTO_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Identity used for orchestrator messages
    #[arg(long, env = "OTTO_ORCHESTRATOR_ID", default_value = "orchestrator", global = true)]
    pub orchestrator: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question (sets the agent to waiting)
    Ask {
        /// Question text
        question: String,

        /// Agent asking
        #[arg(long, env = "OTTO_AGENT_ID")]
        id: String,

        /// Flag the question for a human
        #[arg(long)]
        human: bool,
    },

    /// Post a message, broadcast unless --to is given
    Say {
        /// Message text
        message: String,

        /// Sending agent
        #[arg(long, env = "OTTO_AGENT_ID")]
        id: String,

        /// Recipient
        #[arg(long)]
        to: Option<String>,
    },

    /// Queue a prompt for an agent's next turn
    Prompt {
        /// Target agent
        agent: String,

        /// Prompt text
        message: String,
    },

    /// Mark an agent complete and post its exit message
    Complete {
        /// Summary for the exit message
        summary: Option<String>,

        /// Agent finishing
        #[arg(long, env = "OTTO_AGENT_ID")]
        id: String,
    },

    /// List agents and their statuses
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Read unread messages (marks them read)
    Messages {
        /// Reader
        #[arg(long, env = "OTTO_AGENT_ID")]
        id: Option<String>,

        /// Only this message type
        #[arg(long = "type", value_parser = parse_message_type)]
        message_type: Option<MessageType>,

        /// Only from this sender
        #[arg(long)]
        from: Option<String>,

        /// Only messages mentioning this agent
        #[arg(long)]
        mention: Option<String>,

        /// Maximum number of messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Include already-read messages and leave read state untouched
        #[arg(short, long)]
        all: bool,
    },

    /// Show an agent's transcript
    Log {
        /// Agent ID
        agent: String,

        /// Only the last N entries
        #[arg(long)]
        tail: Option<usize>,

        /// Only prompts (in) or output (out)
        #[arg(long, value_parser = parse_direction)]
        direction: Option<Direction>,

        /// Print stored lines without rendering JSON records
        #[arg(long)]
        raw: bool,
    },

    /// Create a worker and run its first turn
    Spawn {
        /// Agent type (claude, codex)
        agent_type: String,

        /// Task description
        task: String,

        /// Files to focus on
        #[arg(long)]
        files: Option<String>,

        /// Extra context for the worker
        #[arg(long)]
        context: Option<String>,
    },

    /// Run one turn for an existing worker using its pending prompt
    WorkerSpawn {
        /// Agent ID
        agent: String,
    },

    /// Manage orchestrator tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Create {
        /// Task title
        title: String,

        /// Parent task ID
        #[arg(long)]
        parent: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Repository path (default: current directory)
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Branch
        #[arg(long, default_value = "main")]
        branch: String,
    },

    /// Show a task
    Show {
        id: String,
    },

    /// Update fields of a task
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, value_parser = parse_task_status)]
        status: Option<TaskStatus>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Soft-delete a task
    Delete {
        id: String,
    },

    /// List tasks
    List {
        /// Only children of this task
        #[arg(long)]
        parent: Option<String>,

        /// Include deleted tasks
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_message_type(s: &str) -> Result<MessageType, String> {
    s.parse()
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    s.parse()
}

fn parse_task_status(s: &str) -> Result<TaskStatus, String> {
    s.parse()
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Builds the runtime configuration from flags and environment.
    pub fn runtime_config(&self) -> RuntimeConfig {
        let config = RuntimeConfig::new().with_orchestrator_id(&self.orchestrator);
        match &self.state_dir {
            Some(dir) => config.with_state_dir(dir),
            None => config,
        }
    }
}
