//! Codex CLI adapter.

use crate::traits::{AdapterInfo, AgentAdapter, SessionRef};

/// Adapter for `codex exec`.
///
/// Codex picks its own thread ID, so a placeholder is never passed on. The
/// thread is resumed only after the process has reported it.
pub struct CodexAdapter {
    info: AdapterInfo,
}

impl CodexAdapter {
    pub fn new() -> Self {
        Self {
            info: AdapterInfo {
                id: "codex".to_string(),
                name: "Codex".to_string(),
                command: "codex".to_string(),
            },
        }
    }
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for CodexAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn launch_command(&self, prompt: &str, session: &SessionRef<'_>) -> (String, Vec<String>) {
        let mut args = vec!["exec".to_string(), "--json".to_string()];
        if let SessionRef::Confirmed(id) = session {
            args.push("resume".to_string());
            args.push(id.to_string());
        }
        args.push(prompt.to_string());
        (self.info.command.clone(), args)
    }
}
