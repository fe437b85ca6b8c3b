//! Starting vendor processes and streaming their output.
//!
//! A [`ProcessRunner`] turns a [`LaunchSpec`] into a [`ProcessHandle`]: a
//! channel of output chunks that closes once the process has exited and
//! both pipes are drained, plus a [`Cleanup`] that releases the process.

use std::fmt;
use std::io;
use std::process::Stdio;

use otto_models::LogStream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};

/// One piece of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptChunk {
    /// `Stdout` or `Stderr`.
    pub stream: LogStream,
    /// Output text, verbatim.
    pub data: String,
}

impl TranscriptChunk {
    pub fn stdout(data: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stdout,
            data: data.into(),
        }
    }

    pub fn stderr(data: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stderr,
            data: data.into(),
        }
    }
}

/// What to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }

    /// Adds environment variables.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

type CleanupFn = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// One-shot release of a started process.
///
/// [`run`](Cleanup::run) consumes the handle, so it can be invoked at most
/// once. A handle dropped without being run (early return, cancelled
/// future) runs its release on drop.
pub struct Cleanup {
    release: Option<CleanupFn>,
}

impl Cleanup {
    pub fn new(release: impl FnOnce() -> io::Result<()> + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A cleanup with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Runs the release now.
    pub fn run(mut self) -> io::Result<()> {
        match self.release.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(e) = release() {
                warn!(error = %e, "cleanup on drop failed");
            }
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

/// A started process.
#[derive(Debug)]
pub struct ProcessHandle {
    /// OS process ID, when known.
    pub pid: Option<u32>,
    /// Output chunks in arrival order. Closed after the process exits.
    pub chunks: mpsc::Receiver<TranscriptChunk>,
    /// Releases the process.
    pub cleanup: Cleanup,
}

/// Capability to start external processes.
pub trait ProcessRunner: Send + Sync {
    /// Starts `spec` and returns its output stream.
    ///
    /// Must be called from within a Tokio runtime.
    fn start(&self, spec: &LaunchSpec) -> Result<ProcessHandle>;
}

/// Runs processes with `tokio::process`, one chunk per output line.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    channel_capacity: usize,
}

impl TokioProcessRunner {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn start(&self, spec: &LaunchSpec) -> Result<ProcessHandle> {
        let program = which::which(&spec.command)
            .map_err(|_| RuntimeError::CommandNotFound(spec.command.clone()))?;

        let mut child = Command::new(&program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: spec.command.clone(),
                source,
            })?;

        let pid = child.id();
        debug!(command = %spec.command, ?pid, "process started");

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, LogStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, LogStream::Stderr, tx.clone()));
        }

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            // Holding a sender keeps the stream open until the process is gone.
            let _open = tx;
            let killed = tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => debug!(?pid, %status, "process exited"),
                        Err(e) => warn!(?pid, error = %e, "failed to wait for process"),
                    }
                    false
                }
                _ = kill_rx => true,
            };
            if killed {
                if let Err(e) = child.kill().await {
                    debug!(?pid, error = %e, "kill after cleanup failed");
                }
            }
        });

        // A closed receiver means the waiter already saw the process exit.
        let cleanup = Cleanup::new(move || {
            let _ = kill_tx.send(());
            Ok(())
        });

        Ok(ProcessHandle {
            pid,
            chunks: rx,
            cleanup,
        })
    }
}

/// Forwards one chunk per line. Invalid UTF-8 is replaced rather than
/// ending the stream.
async fn forward_lines<R>(reader: R, stream: LogStream, tx: mpsc::Sender<TranscriptChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let data = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
                if tx.send(TranscriptChunk { stream, data }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(%stream, error = %e, "failed to read process output");
                break;
            }
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
