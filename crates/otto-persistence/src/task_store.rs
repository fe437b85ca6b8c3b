//! Orchestrator task storage.

use chrono::Utc;
use otto_models::{Task, TaskFilter, TaskUpdate};

use crate::error::{PersistenceError, Result};
use crate::store::{decode, encode, Store};

const KIND: &str = "task";

/// Task table. Deletion is soft: rows keep their data and gain `deleted_at`.
pub struct TaskStore<'s> {
    store: &'s Store,
}

impl<'s> TaskStore<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Inserts a new task.
    pub fn create_task(&self, task: &Task) -> Result<()> {
        let mut wtxn = self.store.write_txn()?;
        let db = self.store.dbs.tasks;

        if db.get(&wtxn, &task.id)?.is_some() {
            return Err(PersistenceError::duplicate(KIND, &task.id));
        }
        db.put(&mut wtxn, &task.id, &encode(task)?)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Loads a task by ID, including soft-deleted ones.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        let rtxn = self.store.read_txn()?;
        match self.store.dbs.tasks.get(&rtxn, id)? {
            Some(bytes) => decode(bytes),
            None => Err(PersistenceError::not_found(KIND, id)),
        }
    }

    /// Returns true if the ID is taken, deleted tasks included.
    pub fn exists(&self, id: &str) -> Result<bool> {
        let rtxn = self.store.read_txn()?;
        Ok(self.store.dbs.tasks.get(&rtxn, id)?.is_some())
    }

    /// Applies a partial update and returns the new row.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown or deleted tasks.
    pub fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        self.modify(id, |task| task.apply(update))
    }

    /// Soft-deletes a task.
    pub fn delete_task(&self, id: &str) -> Result<Task> {
        self.modify(id, |task| {
            let now = Utc::now();
            task.deleted_at = Some(now);
            task.updated_at = now;
        })
    }

    /// Lists tasks matching `filter`, oldest first.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let rtxn = self.store.read_txn()?;
        let mut tasks = Vec::new();
        for item in self.store.dbs.tasks.iter(&rtxn)? {
            let (_, bytes) = item?;
            let task: Task = decode(bytes)?;
            if filter.matches(&task) {
                tasks.push(task);
            }
        }
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Task)) -> Result<Task> {
        let mut wtxn = self.store.write_txn()?;
        let db = self.store.dbs.tasks;

        let mut task: Task = match db.get(&wtxn, id)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(PersistenceError::not_found(KIND, id)),
        };
        if task.is_deleted() {
            return Err(PersistenceError::not_found(KIND, id));
        }

        f(&mut task);
        db.put(&mut wtxn, id, &encode(&task)?)?;
        wtxn.commit()?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_models::TaskStatus;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), 16).unwrap();
        (dir, store)
    }

    #[test]
    fn test_create_get() {
        let (_dir, store) = open();
        let task = Task::new("t-0a1b2", "Auth", "/repo", "main").with_notes("jwt");

        store.tasks().create_task(&task).unwrap();
        let loaded = store.tasks().get_task("t-0a1b2").unwrap();

        assert_eq!(loaded, task);
        assert!(store.tasks().create_task(&task).is_err());
    }

    #[test]
    fn test_partial_update() {
        let (_dir, store) = open();
        let task = Task::new("t-00001", "Auth", "/repo", "main").with_notes("jwt");
        store.tasks().create_task(&task).unwrap();

        let updated = store
            .tasks()
            .update_task(
                "t-00001",
                &TaskUpdate {
                    status: Some(TaskStatus::Closed),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Closed);
        assert_eq!(updated.title, "Auth");
        assert_eq!(updated.notes.as_deref(), Some("jwt"));
        assert_eq!(store.tasks().get_task("t-00001").unwrap(), updated);
    }

    #[test]
    fn test_update_missing_task() {
        let (_dir, store) = open();
        let err = store
            .tasks()
            .update_task("t-fffff", &TaskUpdate::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_soft_delete() {
        let (_dir, store) = open();
        store
            .tasks()
            .create_task(&Task::new("t-00001", "Auth", "/repo", "main"))
            .unwrap();

        let deleted = store.tasks().delete_task("t-00001").unwrap();
        assert!(deleted.is_deleted());

        // Row is kept but hidden and frozen.
        assert!(store.tasks().exists("t-00001").unwrap());
        assert!(store.tasks().list_tasks(&TaskFilter::default()).unwrap().is_empty());
        assert!(store
            .tasks()
            .update_task(
                "t-00001",
                &TaskUpdate {
                    title: Some("x".into()),
                    ..Default::default()
                }
            )
            .unwrap_err()
            .is_not_found());

        let all = store
            .tasks()
            .list_tasks(&TaskFilter {
                include_deleted: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_list_children() {
        let (_dir, store) = open();
        let tasks = store.tasks();
        tasks
            .create_task(&Task::new("t-00001", "Root", "/repo", "main"))
            .unwrap();
        tasks
            .create_task(&Task::new("t-00002", "Child", "/repo", "main").with_parent("t-00001"))
            .unwrap();
        tasks
            .create_task(&Task::new("t-00003", "Other", "/other", "main"))
            .unwrap();

        let children = tasks
            .list_tasks(&TaskFilter {
                parent_id: Some("t-00001".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "t-00002");

        let in_repo = tasks
            .list_tasks(&TaskFilter {
                repo_path: Some("/repo".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_repo.len(), 2);
    }
}
