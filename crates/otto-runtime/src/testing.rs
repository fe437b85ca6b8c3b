//! In-memory process runner for tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{Result, RuntimeError};
use crate::runner::{Cleanup, LaunchSpec, ProcessHandle, ProcessRunner, TranscriptChunk};

/// Runner that replays canned chunks instead of starting a process.
///
/// Counts cleanups and records every launch so tests can assert on both.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    chunks: Vec<TranscriptChunk>,
    hang: bool,
    fail_start: bool,
    cleanup_error: Option<String>,
    cleanups: Arc<AtomicUsize>,
    launches: Arc<Mutex<Vec<LaunchSpec>>>,
    open: Arc<Mutex<Vec<mpsc::Sender<TranscriptChunk>>>>,
}

impl ScriptedRunner {
    /// Emits `chunks`, then closes the stream.
    pub fn new(chunks: Vec<TranscriptChunk>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }

    /// Parses `out:` / `err:` prefixed lines into chunks.
    ///
    /// ```
    /// use otto_runtime::testing::ScriptedRunner;
    ///
    /// let runner = ScriptedRunner::from_lines(&["out:line1", "err:line2"]);
    /// ```
    pub fn from_lines(lines: &[&str]) -> Self {
        let chunks = lines
            .iter()
            .map(|line| match line.strip_prefix("err:") {
                Some(data) => TranscriptChunk::stderr(data),
                None => TranscriptChunk::stdout(line.strip_prefix("out:").unwrap_or(line)),
            })
            .collect();
        Self::new(chunks)
    }

    /// Emits the chunks but never closes the stream.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Makes `start` fail.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Makes the cleanup return an error.
    pub fn failing_cleanup(mut self, message: impl Into<String>) -> Self {
        self.cleanup_error = Some(message.into());
        self
    }

    /// Number of cleanups run so far.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    /// Launches seen so far.
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.launches
            .lock()
            .map(|launches| launches.clone())
            .unwrap_or_default()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn start(&self, spec: &LaunchSpec) -> Result<ProcessHandle> {
        if let Ok(mut launches) = self.launches.lock() {
            launches.push(spec.clone());
        }
        if self.fail_start {
            return Err(RuntimeError::Spawn {
                command: spec.command.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted failure"),
            });
        }

        // Capacity covers every chunk, so try_send cannot fill up.
        let (tx, rx) = mpsc::channel(self.chunks.len() + 1);
        for chunk in &self.chunks {
            let _ = tx.try_send(chunk.clone());
        }
        if self.hang {
            if let Ok(mut open) = self.open.lock() {
                open.push(tx);
            }
        }

        let cleanups = Arc::clone(&self.cleanups);
        let error = self.cleanup_error.clone();
        let cleanup = Cleanup::new(move || {
            cleanups.fetch_add(1, Ordering::SeqCst);
            match error {
                Some(message) => Err(io::Error::new(io::ErrorKind::Other, message)),
                None => Ok(()),
            }
        });

        Ok(ProcessHandle {
            pid: Some(9999),
            chunks: rx,
            cleanup,
        })
    }
}
