//! Orchestrator task records.
//!
//! Tasks form a tree through `parent_id` and are never physically removed;
//! deleting a task stamps `deleted_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Open,
    /// Being worked on.
    InProgress,
    /// Finished.
    Closed,
}

impl TaskStatus {
    /// Returns the storage/display name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "closed" => Ok(TaskStatus::Closed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// A unit of orchestrator-tracked work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier of the form `t-xxxxx`.
    pub id: String,

    /// Parent task. `None` for root tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Short title.
    pub title: String,

    /// Current state.
    pub status: TaskStatus,

    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    /// Repository the task belongs to.
    pub repo_path: String,

    /// Branch the task belongs to.
    pub branch: String,
}

impl Task {
    /// Creates a new open root task.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        repo_path: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            status: TaskStatus::Open,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            repo_path: repo_path.into(),
            branch: branch.into(),
        }
    }

    /// Sets the parent task.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns true if the task has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Applies a partial update and bumps `updated_at`.
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(notes) = &update.notes {
            self.notes = Some(notes.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Optional fields for a partial task update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
}

impl TaskUpdate {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.notes.is_none()
    }
}

/// Query over stored tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only children of this task.
    pub parent_id: Option<String>,
    /// Only tasks from this repository.
    pub repo_path: Option<String>,
    /// Include soft-deleted tasks.
    pub include_deleted: bool,
}

impl TaskFilter {
    /// Checks whether a task passes the filter.
    pub fn matches(&self, task: &Task) -> bool {
        if !self.include_deleted && task.is_deleted() {
            return false;
        }
        if let Some(parent_id) = &self.parent_id {
            if task.parent_id.as_ref() != Some(parent_id) {
                return false;
            }
        }
        if let Some(repo_path) = &self.repo_path {
            if &task.repo_path != repo_path {
                return false;
            }
        }
        true
    }
}
