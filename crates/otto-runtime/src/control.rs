//! Control records embedded in vendor output.
//!
//! Vendor CLIs in JSON mode print one record per line. A few of those carry
//! metadata the runtime cares about; everything else is plain transcript.
//! Inspection never fails: a line that is not JSON, or JSON of an unknown
//! shape, simply yields nothing.
//!
//! ```text
//! {"type":"thread.started","thread_id":"..."}                 codex
//! {"type":"system","subtype":"init","session_id":"..."}      claude
//! {"type":"assistant","message":{"content":...}}             claude
//! ```

use otto_models::Content;
use serde::Deserialize;

/// Metadata recognized in a transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// The vendor assigned a session (or thread) identifier.
    SessionStarted(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Record {
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: String,
    },
    #[serde(rename = "system")]
    System {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        session_id: String,
    },
    #[serde(rename = "assistant")]
    Assistant { message: AssistantMessage },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Content,
}

fn parse(line: &str) -> Option<Record> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Looks for a control event in one output line.
pub fn inspect(line: &str) -> Option<ControlEvent> {
    match parse(line)? {
        Record::ThreadStarted { thread_id } if !thread_id.is_empty() => {
            Some(ControlEvent::SessionStarted(thread_id))
        }
        Record::System {
            subtype,
            session_id,
        } if subtype == "init" && !session_id.is_empty() => {
            Some(ControlEvent::SessionStarted(session_id))
        }
        _ => None,
    }
}

/// Renders an assistant record as one readable line, if the line is one.
pub fn summarize(line: &str) -> Option<String> {
    match parse(line)? {
        Record::Assistant { message } => message.content.summary(),
        _ => None,
    }
}
