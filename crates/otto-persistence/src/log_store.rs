//! Append-only transcript log.

use otto_models::{Direction, LogEntry, LogStream};

use crate::agent_store::KEY_SEPARATOR;
use crate::error::Result;
use crate::store::{decode, encode, sequence_key, Store};

const SEQUENCE: &str = "logs";

/// Per-agent log entries keyed `<agent_id>/<sequence>`.
///
/// Agent IDs never contain the separator, so a prefix scan on
/// `<agent_id>/` only sees that agent's entries.
pub struct LogStore<'s> {
    store: &'s Store,
}

impl<'s> LogStore<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Appends one entry for `agent_id` and returns it.
    pub fn append(
        &self,
        agent_id: &str,
        direction: Direction,
        stream: LogStream,
        content: &str,
    ) -> Result<LogEntry> {
        let entry = LogEntry::new(agent_id, direction, stream, content);

        let mut wtxn = self.store.write_txn()?;
        let seq = self.store.next_sequence(&mut wtxn, SEQUENCE)?;
        let key = format!("{}{}{}", agent_id, KEY_SEPARATOR, sequence_key(seq));
        self.store.dbs.logs.put(&mut wtxn, &key, &encode(&entry)?)?;
        wtxn.commit()?;

        Ok(entry)
    }

    /// Lists an agent's entries in append order, optionally for one direction.
    pub fn list(&self, agent_id: &str, direction: Option<Direction>) -> Result<Vec<LogEntry>> {
        let rtxn = self.store.read_txn()?;
        let prefix = format!("{}{}", agent_id, KEY_SEPARATOR);

        let mut entries = Vec::new();
        for item in self.store.dbs.logs.prefix_iter(&rtxn, &prefix)? {
            let (_, bytes) = item?;
            let entry: LogEntry = decode(bytes)?;
            if direction.map_or(true, |d| entry.direction == d) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Returns the last `n` entries for an agent, oldest first.
    pub fn tail(&self, agent_id: &str, n: usize) -> Result<Vec<LogEntry>> {
        let mut entries = self.list(agent_id, None)?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), 16).unwrap();
        (dir, store)
    }

    fn contents(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let (_dir, store) = open();
        let logs = store.logs();

        logs.append("w", Direction::In, LogStream::In, "prompt").unwrap();
        for i in 0..12 {
            logs.append("w", Direction::Out, LogStream::Stdout, &format!("line{}", i))
                .unwrap();
        }

        let out = logs.list("w", Some(Direction::Out)).unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(out[0].content, "line0");
        assert_eq!(out[11].content, "line11");

        let inbound = logs.list("w", Some(Direction::In)).unwrap();
        assert_eq!(contents(&inbound), vec!["prompt"]);
    }

    #[test]
    fn test_agents_are_isolated() {
        let (_dir, store) = open();
        let logs = store.logs();

        logs.append("w", Direction::Out, LogStream::Stdout, "mine").unwrap();
        logs.append("w2", Direction::Out, LogStream::Stdout, "theirs").unwrap();

        assert_eq!(contents(&logs.list("w", None).unwrap()), vec!["mine"]);
        assert_eq!(contents(&logs.list("w2", None).unwrap()), vec!["theirs"]);
        assert!(logs.list("nobody", None).unwrap().is_empty());
    }

    #[test]
    fn test_stderr_is_outbound() {
        let (_dir, store) = open();
        let entry = store
            .logs()
            .append("w", Direction::Out, LogStream::Stderr, "boom")
            .unwrap();

        assert_eq!(entry.direction, Direction::Out);
        let listed = store.logs().list("w", Some(Direction::Out)).unwrap();
        assert_eq!(listed[0].stream, LogStream::Stderr);
    }

    #[test]
    fn test_tail() {
        let (_dir, store) = open();
        let logs = store.logs();
        for line in ["a", "b", "c", "d"] {
            logs.append("w", Direction::Out, LogStream::Stdout, line).unwrap();
        }

        assert_eq!(contents(&logs.tail("w", 2).unwrap()), vec!["c", "d"]);
        assert_eq!(logs.tail("w", 10).unwrap().len(), 4);
        assert!(logs.tail("w", 0).unwrap().is_empty());
    }
}
