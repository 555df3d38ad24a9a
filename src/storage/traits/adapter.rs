//! Storage adapter trait.

use crate::models::{NewTodo, Todo, TodoId, TodoPatch};
use crate::{Error, Result};
use async_trait::async_trait;

/// The capability set every todo backend implements.
///
/// Application code holds an `Arc<dyn TodoAdapter>` and never names a
/// concrete backend.
///
/// # Lifecycle
///
/// [`initialize`](Self::initialize) must complete successfully before any
/// CRUD call. Calls made earlier fail with [`Error::NotReady`]; nothing is
/// queued.
///
/// # Concurrency
///
/// Each call completes atomically from the caller's point of view. Ordering
/// between two calls racing on the same record is not guaranteed: whichever
/// completes last determines the final state.
#[async_trait]
pub trait TodoAdapter: Send + Sync {
    /// Short backend name used in logs, metrics and errors.
    fn backend_name(&self) -> &'static str;

    /// Prepares the store (opening files, running migrations).
    ///
    /// Failures are returned as [`Error::Initialization`]; this never
    /// panics. Callers should invoke it once per adapter.
    async fn initialize(&self) -> Result<()>;

    /// True only after a successful [`initialize`](Self::initialize).
    fn is_ready(&self) -> bool;

    /// Returns every record, newest `created_at` first.
    async fn get_todos(&self) -> Result<Vec<Todo>>;

    /// Looks up a record. A missing id is `Ok(None)`, not an error.
    async fn get_todo_by_id(&self, id: &TodoId) -> Result<Option<Todo>>;

    /// Stores a new record and returns it as persisted.
    ///
    /// The adapter assigns the id (unless supplied) and both timestamps.
    async fn create_todo(&self, todo: NewTodo) -> Result<Todo>;

    /// Merges `patch` into an existing record and returns it as persisted.
    ///
    /// `id` and `created_at` are preserved and `updated_at` moves strictly
    /// forward. Fails with [`Error::NotFound`] for an unknown id, leaving
    /// the store untouched.
    async fn update_todo(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo>;

    /// Hard-deletes a record. Deleting a missing id is a no-op.
    async fn delete_todo(&self, id: &TodoId) -> Result<()>;

    /// Flips the `completed` flag of a record.
    async fn toggle_todo(&self, id: &TodoId) -> Result<Todo> {
        let todo = self
            .get_todo_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
        self.update_todo(id, TodoPatch::new().with_completed(!todo.completed))
            .await
    }
}

impl std::fmt::Debug for dyn TodoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoAdapter").field("backend", &self.backend_name()).finish()
    }
}
