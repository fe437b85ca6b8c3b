//! Message payloads that are either plain text or a list of typed blocks.
//!
//! Vendor transcripts carry `content` as a bare string for simple turns and
//! as an array of `{"type": ..., ...}` blocks once tools are involved.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of a vendor message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Typed blocks (text, tool_use, tool_result, ...).
    Blocks(Vec<ContentBlock>),
}

/// One typed block within a [`Content::Blocks`] payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block kind, e.g. "text" or "tool_use".
    #[serde(rename = "type")]
    pub kind: String,

    /// Remaining block fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentBlock {
    /// Returns a string field of this block.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl Content {
    /// Returns the text: the string itself, or the first `text` block.
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text.as_str()),
            Content::Blocks(blocks) => blocks
                .iter()
                .find(|b| b.kind == "text")
                .and_then(|b| b.str_field("text")),
        }
    }

    /// Returns the name of the first `tool_use` block.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Content::Text(_) => None,
            Content::Blocks(blocks) => blocks
                .iter()
                .find(|b| b.kind == "tool_use")
                .and_then(|b| b.str_field("name")),
        }
    }

    /// Returns a one-line rendering for transcript views.
    pub fn summary(&self) -> Option<String> {
        if let Some(text) = self.text().filter(|t| !t.is_empty()) {
            return Some(text.to_string());
        }
        self.tool_name().map(|name| format!("[tool: {}]", name))
    }
}
