//! Durable message storage with filtered, ordered queries.

use heed::RwTxn;
use otto_models::{Message, MessageFilter, MessageId};

use crate::error::{PersistenceError, Result};
use crate::store::{decode, encode, sequence_key, Store};

const KIND: &str = "message";
const SEQUENCE: &str = "messages";

/// Message table.
///
/// Rows are keyed by insertion sequence, so a full scan yields creation
/// order with ties broken by insertion order.
pub struct MessageStore<'s> {
    store: &'s Store,
}

impl<'s> MessageStore<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Inserts a new message.
    ///
    /// # Errors
    /// Returns `Duplicate` if a message with the same ID exists.
    pub fn create_message(&self, message: &Message) -> Result<()> {
        let mut wtxn = self.store.write_txn()?;
        insert_message(self.store, &mut wtxn, message)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Loads a message by ID.
    pub fn get_message(&self, id: &MessageId) -> Result<Message> {
        let rtxn = self.store.read_txn()?;
        let dbs = self.store.dbs;

        let key = dbs
            .message_ids
            .get(&rtxn, id.as_str())?
            .ok_or_else(|| PersistenceError::not_found(KIND, id.as_str()))?;
        match dbs.messages.get(&rtxn, key)? {
            Some(bytes) => decode(bytes),
            None => Err(PersistenceError::InvalidData(format!(
                "message index points at missing row {}",
                key
            ))),
        }
    }

    /// Lists messages matching `filter`, oldest first.
    ///
    /// `filter.limit` is applied after every other predicate.
    pub fn list_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let rtxn = self.store.read_txn()?;
        let mut messages = Vec::new();

        for item in self.store.dbs.messages.iter(&rtxn)? {
            if filter.limit.is_some_and(|limit| messages.len() >= limit) {
                break;
            }
            let (_, bytes) = item?;
            let message: Message = decode(bytes)?;
            if filter.matches(&message) {
                messages.push(message);
            }
        }

        Ok(messages)
    }

    /// Adds `reader` to a message's read-by set.
    ///
    /// Returns false if the reader had already consumed the message.
    pub fn mark_read(&self, id: &MessageId, reader: &str) -> Result<bool> {
        let mut wtxn = self.store.write_txn()?;
        let dbs = self.store.dbs;

        let key = match dbs.message_ids.get(&wtxn, id.as_str())? {
            Some(key) => key.to_string(),
            None => return Err(PersistenceError::not_found(KIND, id.as_str())),
        };
        let mut message: Message = match dbs.messages.get(&wtxn, &key)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(PersistenceError::not_found(KIND, id.as_str())),
        };

        if !message.mark_read(reader) {
            return Ok(false);
        }
        dbs.messages.put(&mut wtxn, &key, &encode(&message)?)?;
        wtxn.commit()?;
        Ok(true)
    }
}

/// Writes `message` inside an open write transaction.
pub(crate) fn insert_message(store: &Store, wtxn: &mut RwTxn<'_>, message: &Message) -> Result<()> {
    let dbs = store.dbs;

    if dbs.message_ids.get(wtxn, message.id.as_str())?.is_some() {
        return Err(PersistenceError::duplicate(KIND, message.id.as_str()));
    }

    let key = sequence_key(store.next_sequence(wtxn, SEQUENCE)?);
    dbs.messages.put(wtxn, &key, &encode(message)?)?;
    dbs.message_ids.put(wtxn, message.id.as_str(), &key)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_models::MessageType;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), 16).unwrap();
        (dir, store)
    }

    fn seed(store: &Store) -> Vec<Message> {
        let messages = vec![
            Message::builder("a", MessageType::Say, "one").build(),
            Message::builder("b", MessageType::Question, "two")
                .mention("a")
                .build(),
            Message::prompt("orchestrator", "a", "three"),
            Message::builder("a", MessageType::Say, "four").build(),
        ];
        for msg in &messages {
            store.messages().create_message(msg).unwrap();
        }
        messages
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let (_dir, store) = open();
        seed(&store);

        let all = store.messages().list_messages(&MessageFilter::new()).unwrap();
        assert_eq!(contents(&all), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_duplicate_id_fails() {
        let (_dir, store) = open();
        let msg = Message::builder("a", MessageType::Say, "x").id("m1").build();

        store.messages().create_message(&msg).unwrap();
        let err = store.messages().create_message(&msg).unwrap_err();

        assert!(err.is_storage());
        assert_eq!(
            store
                .messages()
                .list_messages(&MessageFilter::new())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_filter_by_type_and_sender() {
        let (_dir, store) = open();
        seed(&store);

        let says = store
            .messages()
            .list_messages(&MessageFilter::new().of_type(MessageType::Say))
            .unwrap();
        assert_eq!(contents(&says), vec!["one", "four"]);

        let from_b = store
            .messages()
            .list_messages(&MessageFilter::new().from("b"))
            .unwrap();
        assert_eq!(contents(&from_b), vec!["two"]);
    }

    #[test]
    fn test_filter_by_mention_and_recipient() {
        let (_dir, store) = open();
        seed(&store);

        let mentioned = store
            .messages()
            .list_messages(&MessageFilter::new().mentioning("a"))
            .unwrap();
        assert_eq!(contents(&mentioned), vec!["two"]);

        let directed = store
            .messages()
            .list_messages(&MessageFilter::new().to("a"))
            .unwrap();
        assert_eq!(contents(&directed), vec!["three"]);
    }

    #[test]
    fn test_unread_filter_excludes_read_messages() {
        let (_dir, store) = open();
        let messages = seed(&store);

        assert!(store.messages().mark_read(&messages[0].id, "r").unwrap());
        assert!(store.messages().mark_read(&messages[2].id, "r").unwrap());

        let unread = store
            .messages()
            .list_messages(&MessageFilter::new().unread_by("r"))
            .unwrap();
        assert_eq!(contents(&unread), vec!["two", "four"]);

        // Another reader still sees everything.
        let other = store
            .messages()
            .list_messages(&MessageFilter::new().unread_by("s"))
            .unwrap();
        assert_eq!(other.len(), 4);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let (_dir, store) = open();
        let messages = seed(&store);

        assert!(store.messages().mark_read(&messages[1].id, "r").unwrap());
        assert!(!store.messages().mark_read(&messages[1].id, "r").unwrap());

        let loaded = store.messages().get_message(&messages[1].id).unwrap();
        assert_eq!(loaded.read_by.len(), 1);
        assert!(loaded.is_read_by("r"));
    }

    #[test]
    fn test_mark_read_missing_message() {
        let (_dir, store) = open();
        let err = store
            .messages()
            .mark_read(&MessageId::from("nope"), "r")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_limit_applies_after_filters() {
        let (_dir, store) = open();
        seed(&store);

        // "three" is skipped by the sender predicate, not by the cap.
        let limited = store
            .messages()
            .list_messages(&MessageFilter::new().from("a").limit(2))
            .unwrap();
        assert_eq!(contents(&limited), vec!["one", "four"]);

        let first = store
            .messages()
            .list_messages(&MessageFilter::new().limit(1))
            .unwrap();
        assert_eq!(contents(&first), vec!["one"]);
    }
}
