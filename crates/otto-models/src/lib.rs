//! Core data models for Otto.
//!
//! This crate provides the fundamental data types shared by every Otto
//! crate: agents and their lifecycle, bus messages, transcript log entries,
//! and orchestrator tasks.

pub mod agent;
pub mod builders;
pub mod content;
pub mod ids;
pub mod log;
pub mod message;
pub mod task;

// Re-export main types
pub use agent::{Agent, AgentStatus};
pub use builders::MessageBuilder;
pub use content::{Content, ContentBlock};
pub use ids::MessageId;
pub use log::{Direction, LogEntry, LogStream};
pub use message::{Message, MessageFilter, MessageType};
pub use task::{Task, TaskFilter, TaskStatus, TaskUpdate};
