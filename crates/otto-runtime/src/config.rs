//! Runtime configuration and state locations.
//!
//! # Environment Variables
//!
//! - `OTTO_STATE_DIR`: Override the base state directory
//! - `OTTO_DB_DIR`: Override the database directory

use std::path::{Path, PathBuf};

use otto_persistence::Store;

use crate::error::Result;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "OTTO_STATE_DIR";

/// Environment variable for custom database directory.
pub const DB_DIR_ENV: &str = "OTTO_DB_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".otto";

const DB_SUBDIR: &str = "db";

/// Get the Otto state directory.
///
/// 1. `OTTO_STATE_DIR` if set
/// 2. `~/.otto` if a home directory is available
/// 3. `.otto` in the current directory
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the database directory: `OTTO_DB_DIR`, else `<state_dir>/db`.
pub fn db_dir() -> PathBuf {
    std::env::var(DB_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(DB_SUBDIR))
}

/// Configuration passed explicitly into every runtime operation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Identity used for orchestrator-authored messages. It may post without
    /// being a registered agent.
    pub orchestrator_id: String,
    /// Buffer size of the chunk channel between process readers and the
    /// pipeline.
    pub channel_capacity: usize,
    /// Extra environment for every spawned process.
    pub extra_env: Vec<(String, String)>,
    /// LMDB map size in megabytes.
    pub map_size_mb: usize,
    /// Where the store lives.
    pub db_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            orchestrator_id: "orchestrator".to_string(),
            channel_capacity: 256,
            extra_env: Vec::new(),
            map_size_mb: 1024,
            db_dir: db_dir(),
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the orchestrator identity.
    pub fn with_orchestrator_id(mut self, id: impl Into<String>) -> Self {
        self.orchestrator_id = id.into();
        self
    }

    /// Sets the chunk channel capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Adds an environment variable for spawned processes.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Sets the LMDB map size.
    pub fn with_map_size_mb(mut self, mb: usize) -> Self {
        self.map_size_mb = mb;
        self
    }

    /// Places the store under `<dir>/db`.
    pub fn with_state_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.db_dir = dir.as_ref().join(DB_SUBDIR);
        self
    }

    /// Places the store directly in `dir`.
    pub fn with_db_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.db_dir = dir.into();
        self
    }

    /// Opens the store this config points at.
    pub fn open_store(&self) -> Result<Store> {
        Ok(Store::open(&self.db_dir, self.map_size_mb)?)
    }
}
