//! Collision-checked identifier allocation for agents and tasks.

use rand::Rng;

use crate::error::{PersistenceError, Result};
use crate::store::Store;

/// Maximum length of the slug part of an agent ID.
pub const MAX_SLUG_LEN: usize = 16;

/// Agent ID used when a task has no alphanumeric characters.
pub const FALLBACK_AGENT_ID: &str = "agent";

/// Number of random task IDs tried before giving up.
pub const TASK_ID_ATTEMPTS: usize = 10;

/// Size of the task ID space (5 hex digits).
pub const TASK_ID_SPACE: u32 = 0x10_0000;

/// Derives a lowercase alphanumeric slug from a task description.
///
/// ```
/// use otto_persistence::ids::slugify;
///
/// assert_eq!(slugify("task#1: fix @bugs!"), "task1fixbugs");
/// assert_eq!(slugify("!!!"), "agent");
/// ```
pub fn slugify(task: &str) -> String {
    let slug: String = task
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_SLUG_LEN)
        .collect();

    if slug.is_empty() {
        FALLBACK_AGENT_ID.to_string()
    } else {
        slug
    }
}

/// Formats a draw from the task ID space as `t-xxxxx`.
pub fn format_task_id(n: u32) -> String {
    format!("t-{:05x}", n % TASK_ID_SPACE)
}

/// Draws a task ID from the thread-local CSPRNG.
pub fn random_task_id() -> String {
    format_task_id(rand::rng().random_range(0..TASK_ID_SPACE))
}

/// Allocates identifiers that do not collide with stored rows.
pub struct IdentifierGenerator<'s> {
    store: &'s Store,
}

impl<'s> IdentifierGenerator<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Returns a free agent ID for `task`: the slug, or the slug suffixed
    /// with `-2`, `-3`, ... when taken.
    pub fn agent_id(&self, task: &str) -> Result<String> {
        let base = slugify(task);
        let agents = self.store.agents();

        if !agents.exists(&base)? {
            return Ok(base);
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !agents.exists(&candidate)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Returns a free random task ID.
    ///
    /// # Errors
    /// Returns `IdentifierExhausted` after [`TASK_ID_ATTEMPTS`] collisions.
    pub fn task_id(&self) -> Result<String> {
        self.task_id_with(random_task_id)
    }

    /// Like [`task_id`](Self::task_id) but with a caller-supplied source.
    pub fn task_id_with(&self, mut draw: impl FnMut() -> String) -> Result<String> {
        let tasks = self.store.tasks();
        for _ in 0..TASK_ID_ATTEMPTS {
            let candidate = draw();
            if !tasks.exists(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(PersistenceError::IdentifierExhausted {
            kind: "task".to_string(),
            attempts: TASK_ID_ATTEMPTS,
        })
    }
}
