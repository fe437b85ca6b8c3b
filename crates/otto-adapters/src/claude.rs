//! Claude CLI adapter.

use crate::traits::{AdapterInfo, AgentAdapter, SessionRef};

/// Flags that make the CLI print one JSON record per line.
const STREAM_FLAGS: [&str; 3] = ["--output-format", "stream-json", "--verbose"];

/// Adapter for the `claude` CLI in print mode.
///
/// A placeholder session is handed over with `--session-id` so the CLI
/// adopts it; once confirmed the session is continued with `--resume`.
pub struct ClaudeAdapter {
    info: AdapterInfo,
}

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self {
            info: AdapterInfo {
                id: "claude".to_string(),
                name: "Claude".to_string(),
                command: "claude".to_string(),
            },
        }
    }
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for ClaudeAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn launch_command(&self, prompt: &str, session: &SessionRef<'_>) -> (String, Vec<String>) {
        let mut args = vec!["-p".to_string(), prompt.to_string()];
        match session {
            SessionRef::None => {}
            SessionRef::Placeholder(id) => {
                args.push("--session-id".to_string());
                args.push(id.to_string());
            }
            SessionRef::Confirmed(id) => {
                args.push("--resume".to_string());
                args.push(id.to_string());
            }
        }
        args.extend(STREAM_FLAGS.iter().map(|s| s.to_string()));
        (self.info.command.clone(), args)
    }
}
