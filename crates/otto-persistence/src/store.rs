//! LMDB environment shared by every Otto store.

use std::fs;
use std::path::{Path, PathBuf};

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::agent_store::AgentRegistry;
use crate::error::{PersistenceError, Result};
use crate::ids::IdentifierGenerator;
use crate::log_store::LogStore;
use crate::message_store::MessageStore;
use crate::task_store::TaskStore;

const AGENTS_DB: &str = "agents";
const MESSAGES_DB: &str = "messages";
const MESSAGE_IDS_DB: &str = "message_ids";
const LOGS_DB: &str = "logs";
const TASKS_DB: &str = "tasks";
const META_DB: &str = "meta";

/// Named databases inside the environment.
///
/// ```text
/// agents       agent id       -> Agent (json)
/// messages     sequence key   -> Message (json)
/// message_ids  message id     -> sequence key
/// logs         agent id/seq   -> LogEntry (json)
/// tasks        task id        -> Task (json)
/// meta         counter name   -> u64 (big endian)
/// ```
#[derive(Clone, Copy)]
pub(crate) struct Databases {
    pub(crate) agents: Database<Str, Bytes>,
    pub(crate) messages: Database<Str, Bytes>,
    pub(crate) message_ids: Database<Str, Str>,
    pub(crate) logs: Database<Str, Bytes>,
    pub(crate) tasks: Database<Str, Bytes>,
    pub(crate) meta: Database<Str, Bytes>,
}

/// Handle to the embedded store.
///
/// Cloning is cheap; all clones share the same environment.
#[derive(Clone)]
pub struct Store {
    env: Env,
    path: PathBuf,
    pub(crate) dbs: Databases,
}

impl Store {
    /// Opens (or creates) the store in `path`.
    ///
    /// # Arguments
    /// * `path` - Directory holding the LMDB files
    /// * `map_size_mb` - Maximum size of the environment in megabytes
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or LMDB cannot
    /// open the environment.
    pub fn open(path: impl AsRef<Path>, map_size_mb: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::create_dir_all(&path).map_err(|source| PersistenceError::DirectoryError {
                path: path.clone(),
                source,
            })?;
        }

        // SAFETY: the environment is opened once per process per directory and
        // the files are only ever modified through LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb * 1024 * 1024)
                .max_dbs(8)
                .open(&path)?
        };

        let mut wtxn = env.write_txn()?;
        let dbs = Databases {
            agents: env.create_database(&mut wtxn, Some(AGENTS_DB))?,
            messages: env.create_database(&mut wtxn, Some(MESSAGES_DB))?,
            message_ids: env.create_database(&mut wtxn, Some(MESSAGE_IDS_DB))?,
            logs: env.create_database(&mut wtxn, Some(LOGS_DB))?,
            tasks: env.create_database(&mut wtxn, Some(TASKS_DB))?,
            meta: env.create_database(&mut wtxn, Some(META_DB))?,
        };
        wtxn.commit()?;

        Ok(Self { env, path, dbs })
    }

    /// Returns the directory backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Agent records and status transitions.
    pub fn agents(&self) -> AgentRegistry<'_> {
        AgentRegistry::new(self)
    }

    /// Bus messages.
    pub fn messages(&self) -> MessageStore<'_> {
        MessageStore::new(self)
    }

    /// Transcript log entries.
    pub fn logs(&self) -> LogStore<'_> {
        LogStore::new(self)
    }

    /// Orchestrator tasks.
    pub fn tasks(&self) -> TaskStore<'_> {
        TaskStore::new(self)
    }

    /// Collision-checked identifier allocation.
    pub fn ids(&self) -> IdentifierGenerator<'_> {
        IdentifierGenerator::new(self)
    }

    pub(crate) fn read_txn(&self) -> Result<RoTxn<'_>> {
        Ok(self.env.read_txn()?)
    }

    pub(crate) fn write_txn(&self) -> Result<RwTxn<'_>> {
        Ok(self.env.write_txn()?)
    }

    /// Increments and returns the named counter inside `wtxn`.
    ///
    /// Counters start at 1. Because LMDB has a single writer, values are
    /// unique and strictly increasing in commit order.
    pub(crate) fn next_sequence(&self, wtxn: &mut RwTxn<'_>, counter: &str) -> Result<u64> {
        let current = match self.dbs.meta.get(wtxn, counter)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                    PersistenceError::InvalidData(format!("corrupt counter {}", counter))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.dbs.meta.put(wtxn, counter, &next.to_be_bytes())?;
        Ok(next)
    }
}

/// Zero-padded so lexicographic key order equals numeric order.
pub(crate) fn sequence_key(seq: u64) -> String {
    format!("{:020}", seq)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
