//! Web backend: the whole record set as one JSON blob in a key-value store.
//!
//! [`TodoAdapter::initialize`] reads the blob into an in-memory map. Every
//! mutation edits the map and rewrites the complete blob; nothing is
//! persisted incrementally.
//!
//! # Concurrency
//!
//! Mutations hold the map lock across the read-modify-rewrite, so writes
//! through one adapter never lose each other. Two adapters (or processes)
//! sharing one key are not coordinated: the last blob written wins, and
//! the other writer's changes are lost.

use crate::models::{EventMeta, NewTodo, Timestamp, Todo, TodoEvent, TodoId, TodoPatch};
use crate::observability::{EventBus, record_operation_metrics, status_label};
use crate::storage::lock::acquire_lock;
use crate::storage::traits::{KeyValueStore, TodoAdapter};
use crate::{Error, Result};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "key_value";

/// [`TodoAdapter`] over any [`KeyValueStore`].
pub struct KeyValueTodoAdapter<S> {
    store: S,
    storage_key: String,
    todos: Mutex<HashMap<TodoId, Todo>>,
    ready: AtomicBool,
    events: Option<EventBus>,
}

impl<S: KeyValueStore> KeyValueTodoAdapter<S> {
    /// Creates an adapter storing its blob under `storage_key`.
    #[must_use]
    pub fn new(store: S, storage_key: impl Into<String>) -> Self {
        Self {
            store,
            storage_key: storage_key.into(),
            todos: Mutex::new(HashMap::new()),
            ready: AtomicBool::new(false),
            events: None,
        }
    }

    /// Publishes change events to `events` after each persisted mutation.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotReady { backend: BACKEND })
        }
    }

    fn load(&self) -> Result<HashMap<TodoId, Todo>> {
        let raw = self
            .store
            .get_item(&self.storage_key)
            .map_err(|e| Error::Initialization {
                backend: BACKEND,
                cause: e.to_string(),
            })?;

        let Some(raw) = raw else {
            return Ok(HashMap::new());
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    key = %self.storage_key,
                    error = %e,
                    "Stored todo blob is unreadable, starting empty"
                );
                metrics::counter!("key_value_blob_parse_failures_total").increment(1);
                return Ok(HashMap::new());
            },
        };

        // A bad record costs only itself, never the rest of the set.
        let mut todos = HashMap::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Todo>(record) {
                Ok(todo) => {
                    todos.insert(todo.id.clone(), todo);
                },
                Err(e) => {
                    tracing::warn!(
                        key = %self.storage_key,
                        position,
                        error = %e,
                        "Skipping stored todo without a usable id or title"
                    );
                    metrics::counter!("key_value_record_skipped_total").increment(1);
                },
            }
        }
        Ok(todos)
    }

    /// Serializes every record, newest first, and rewrites the blob.
    fn persist(&self, todos: &HashMap<TodoId, Todo>) -> Result<()> {
        let json = serde_json::to_string(&sorted(todos))
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.store.set_item(&self.storage_key, &json)
    }

    fn publish(&self, event: impl FnOnce(EventMeta) -> TodoEvent) {
        if let Some(events) = &self.events {
            events.publish(event(EventMeta::new(BACKEND)));
        }
    }

    fn create_sync(&self, new: NewTodo) -> Result<Todo> {
        self.ensure_ready()?;
        new.validate()?;

        let mut todos = acquire_lock(&self.todos);
        let todo = Todo::from_new(new, Timestamp::now());
        if todos.contains_key(&todo.id) {
            return Err(Error::InvalidInput(format!("todo already exists: {}", todo.id)));
        }

        todos.insert(todo.id.clone(), todo.clone());
        if let Err(e) = self.persist(&todos) {
            todos.remove(&todo.id);
            return Err(e);
        }
        Ok(todo)
    }

    fn update_sync(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo> {
        self.ensure_ready()?;
        patch.validate()?;

        let mut todos = acquire_lock(&self.todos);
        let Some(current) = todos.get(id).cloned() else {
            return Err(Error::NotFound { id: id.to_string() });
        };

        let mut updated = current.clone();
        updated.apply(patch, Timestamp::after(&current.updated_at));
        todos.insert(id.clone(), updated.clone());

        if let Err(e) = self.persist(&todos) {
            todos.insert(id.clone(), current);
            return Err(e);
        }
        Ok(updated)
    }

    fn delete_sync(&self, id: &TodoId) -> Result<bool> {
        self.ensure_ready()?;

        let mut todos = acquire_lock(&self.todos);
        let Some(removed) = todos.remove(id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&todos) {
            todos.insert(id.clone(), removed);
            return Err(e);
        }
        Ok(true)
    }
}

/// Records ordered by `created_at` descending, then id descending.
fn sorted(todos: &HashMap<TodoId, Todo>) -> Vec<Todo> {
    let mut records: Vec<Todo> = todos.values().cloned().collect();
    records.sort_by_key(|todo| Reverse((todo.created_at.sort_key(), todo.id.as_str().to_string())));
    records
}

#[async_trait]
impl<S: KeyValueStore> TodoAdapter for KeyValueTodoAdapter<S> {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self), fields(operation = "initialize", backend = BACKEND, key = %self.storage_key))]
    async fn initialize(&self) -> Result<()> {
        let start = Instant::now();
        let result = if self.ready.load(Ordering::Acquire) {
            tracing::debug!(backend = BACKEND, "Adapter already initialized");
            Ok(())
        } else {
            self.load().map(|loaded| {
                let count = loaded.len();
                *acquire_lock(&self.todos) = loaded;
                self.ready.store(true, Ordering::Release);
                tracing::info!(backend = BACKEND, count, "Loaded todos from key-value store");
            })
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "Key-value initialization failed");
        }
        record_operation_metrics(BACKEND, "initialize", start, status_label(&result));
        result
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[instrument(skip(self), fields(operation = "get_todos", backend = BACKEND))]
    async fn get_todos(&self) -> Result<Vec<Todo>> {
        let start = Instant::now();
        let result = self
            .ensure_ready()
            .map(|()| sorted(&acquire_lock(&self.todos)));
        record_operation_metrics(BACKEND, "get_todos", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "get_todo_by_id", backend = BACKEND, todo.id = %id))]
    async fn get_todo_by_id(&self, id: &TodoId) -> Result<Option<Todo>> {
        let start = Instant::now();
        let result = self
            .ensure_ready()
            .map(|()| acquire_lock(&self.todos).get(id).cloned());
        record_operation_metrics(BACKEND, "get_todo_by_id", start, status_label(&result));
        result
    }

    #[instrument(skip(self, todo), fields(operation = "create_todo", backend = BACKEND))]
    async fn create_todo(&self, todo: NewTodo) -> Result<Todo> {
        let start = Instant::now();
        let result = self.create_sync(todo);
        if let Ok(stored) = &result {
            tracing::debug!(todo.id = %stored.id, "Created todo");
            self.publish(|meta| TodoEvent::Created {
                meta,
                todo: stored.clone(),
            });
        }
        record_operation_metrics(BACKEND, "create_todo", start, status_label(&result));
        result
    }

    #[instrument(skip(self, patch), fields(operation = "update_todo", backend = BACKEND, todo.id = %id))]
    async fn update_todo(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo> {
        let start = Instant::now();
        let result = self.update_sync(id, patch);
        if let Ok(stored) = &result {
            self.publish(|meta| TodoEvent::Updated {
                meta,
                todo: stored.clone(),
            });
        }
        record_operation_metrics(BACKEND, "update_todo", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "delete_todo", backend = BACKEND, todo.id = %id))]
    async fn delete_todo(&self, id: &TodoId) -> Result<()> {
        let start = Instant::now();
        let result = self.delete_sync(id);
        if let Ok(existed) = &result {
            self.publish(|meta| TodoEvent::Deleted {
                meta,
                id: id.clone(),
                existed: *existed,
            });
        }
        record_operation_metrics(BACKEND, "delete_todo", start, status_label(&result));
        result.map(|_| ())
    }
}
