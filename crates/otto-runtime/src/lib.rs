//! Runtime for Otto workers.
//!
//! This crate drives agents through their turns:
//!
//! - [`MessageBus`]: ask / say / prompt / complete / inbox over the store
//! - [`TranscriptPipeline`]: one worker turn, from prompt to exit message
//! - [`ProcessRunner`]: starting vendor processes and streaming their output
//! - [`control`]: recognizing session metadata inside that output
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use otto_runtime::{RuntimeConfig, SpawnRequest, TokioProcessRunner, TranscriptPipeline};
//!
//! # async fn run() -> otto_runtime::Result<()> {
//! let config = RuntimeConfig::new();
//! let store = config.open_store()?;
//! let runner = Arc::new(TokioProcessRunner::new(config.channel_capacity));
//! let pipeline = TranscriptPipeline::new(store, runner, config);
//!
//! let summary = pipeline
//!     .spawn(&SpawnRequest::new("claude", "auth backend"))
//!     .await?;
//! println!("{} logged {} chunks", summary.agent_id, summary.chunks);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod spawn;
pub mod testing;

pub use bus::MessageBus;
pub use config::{db_dir, state_dir, RuntimeConfig};
pub use control::ControlEvent;
pub use error::{Result, RuntimeError};
pub use pipeline::{TranscriptPipeline, TurnSummary};
pub use runner::{
    Cleanup, LaunchSpec, ProcessHandle, ProcessRunner, TokioProcessRunner, TranscriptChunk,
};
pub use spawn::{build_spawn_prompt, SpawnRequest};
