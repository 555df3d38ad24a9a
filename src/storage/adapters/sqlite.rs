//! Native backend on an embedded `SQLite` database.
//!
//! Records live in the `todos` table created by the bundled migrations. The
//! connection is opened lazily by [`TodoAdapter::initialize`], which also
//! brings the schema up to date; every CRUD call before that fails with
//! [`Error::NotReady`].

use crate::models::{EventMeta, NewTodo, Timestamp, Todo, TodoEvent, TodoId, TodoPatch};
use crate::observability::{EventBus, record_operation_metrics, status_label};
use crate::storage::lock::acquire_lock;
use crate::storage::migrations::{MigrationReport, MigrationRunner, MigrationSet, MigrationStatus};
use crate::storage::sqlite::{TODO_COLUMNS, configure_connection, open_connection, todo_from_row};
use crate::storage::traits::TodoAdapter;
use crate::{Error, Result};
use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DbLocation {
    File(PathBuf),
    InMemory,
}

/// [`TodoAdapter`] backed by `SQLite`.
///
/// A single connection is shared behind a mutex, so calls on one adapter
/// are serialized. Updates run inside an `IMMEDIATE` transaction, which
/// also serializes read-merge-write against other connections to the same
/// file.
pub struct SqliteTodoAdapter {
    location: DbLocation,
    conn: Mutex<Option<Connection>>,
    migrations: Option<MigrationSet>,
    ready: AtomicBool,
    events: Option<EventBus>,
}

impl SqliteTodoAdapter {
    /// Creates an adapter for a database file. Nothing is opened yet.
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self::with_location(DbLocation::File(db_path.into()))
    }

    /// Creates an adapter over a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_location(DbLocation::InMemory)
    }

    const fn with_location(location: DbLocation) -> Self {
        Self {
            location,
            conn: Mutex::new(None),
            migrations: None,
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

    /// Uses `migrations` instead of the bundled set.
    #[must_use]
    pub fn with_migrations(mut self, migrations: MigrationSet) -> Self {
        self.migrations = Some(migrations);
        self
    }

    /// Returns the database path (`None` for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        match &self.location {
            DbLocation::File(path) => Some(path),
            DbLocation::InMemory => None,
        }
    }

    /// Reports which schema migrations are applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] before initialization.
    pub fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        let migrations = self.migration_set()?;
        let guard = acquire_lock(&self.conn);
        let conn = guard.as_ref().ok_or(Error::NotReady { backend: BACKEND })?;
        MigrationRunner::new(&migrations).status(conn)
    }

    fn migration_set(&self) -> Result<MigrationSet> {
        match &self.migrations {
            Some(set) => Ok(set.clone()),
            None => MigrationSet::bundled(),
        }
    }

    fn open(&self) -> Result<Connection> {
        match &self.location {
            DbLocation::File(path) => open_connection(path),
            DbLocation::InMemory => {
                Connection::open_in_memory().map_err(|e| Error::operation("open_database", e))
            },
        }
    }

    fn initialize_sync(&self) -> Result<()> {
        let mut guard = acquire_lock(&self.conn);
        if guard.is_some() {
            tracing::debug!(backend = BACKEND, "Adapter already initialized");
            return Ok(());
        }

        let mut conn = self.open()?;
        configure_connection(&conn);

        let migrations = self.migration_set()?;
        let report: MigrationReport = MigrationRunner::new(&migrations).run(&mut conn)?;
        tracing::info!(
            backend = BACKEND,
            applied = report.applied.len(),
            skipped = report.skipped,
            drifted = report.drifted.len(),
            "Database schema is current"
        );

        *guard = Some(conn);
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotReady { backend: BACKEND })
        }
    }

    /// Runs `f` against the open connection.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = acquire_lock(&self.conn);
        let conn = guard.as_mut().ok_or(Error::NotReady { backend: BACKEND })?;
        f(conn)
    }

    fn publish(&self, event: impl FnOnce(EventMeta) -> TodoEvent) {
        if let Some(events) = &self.events {
            events.publish(event(EventMeta::new(BACKEND)));
        }
    }

    fn select_all(conn: &Connection) -> Result<Vec<Todo>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 ORDER BY julianday(created_at) DESC, rowid DESC"
            ))
            .map_err(|e| Error::operation("prepare_get_todos", e))?;

        let rows = stmt
            .query_map([], todo_from_row)
            .map_err(|e| Error::operation("get_todos", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation("read_todos", e))
    }

    fn select_one(conn: &Connection, id: &TodoId) -> Result<Option<Todo>> {
        conn.query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
            params![id.as_str()],
            todo_from_row,
        )
        .optional()
        .map_err(|e| Error::operation("get_todo_by_id", e))
    }

    fn insert(conn: &Connection, todo: &Todo) -> Result<Todo> {
        conn.query_row(
            &format!(
                "INSERT INTO todos ({TODO_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 RETURNING {TODO_COLUMNS}"
            ),
            params![
                todo.id.as_str(),
                todo.title,
                todo.description,
                todo.completed,
                todo.priority.as_str(),
                todo.created_at.as_str(),
                todo.updated_at.as_str(),
                todo.sync_status.as_str(),
                todo.last_synced_at.as_ref().map(Timestamp::as_str),
            ],
            todo_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                Error::InvalidInput(format!("todo already exists: {}", todo.id))
            },
            other => Error::operation("insert_todo", other),
        })
    }

    fn update(conn: &mut Connection, id: &TodoId, patch: TodoPatch) -> Result<Todo> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::operation("begin_transaction", e))?;

        // Dropping `tx` without commit rolls back.
        let Some(mut todo) = Self::select_one(&tx, id)? else {
            return Err(Error::NotFound { id: id.to_string() });
        };
        let updated_at = Timestamp::after(&todo.updated_at);
        todo.apply(patch, updated_at);

        let stored = tx
            .query_row(
                &format!(
                    "UPDATE todos
                     SET title = ?2, description = ?3, completed = ?4, priority = ?5, updated_at = ?6
                     WHERE id = ?1
                     RETURNING {TODO_COLUMNS}"
                ),
                params![
                    todo.id.as_str(),
                    todo.title,
                    todo.description,
                    todo.completed,
                    todo.priority.as_str(),
                    todo.updated_at.as_str(),
                ],
                todo_from_row,
            )
            .map_err(|e| Error::operation("update_todo", e))?;

        tx.commit()
            .map_err(|e| Error::operation("commit_transaction", e))?;
        Ok(stored)
    }
}

#[async_trait]
impl TodoAdapter for SqliteTodoAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self), fields(operation = "initialize", backend = BACKEND))]
    async fn initialize(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.initialize_sync().map_err(|e| match e {
            init @ Error::Initialization { .. } => init,
            other => Error::Initialization {
                backend: BACKEND,
                cause: other.to_string(),
            },
        });
        if let Err(e) = &result {
            tracing::error!(error = %e, "SQLite initialization failed");
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
        let result = self.with_conn(|conn| Self::select_all(conn));
        record_operation_metrics(BACKEND, "get_todos", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "get_todo_by_id", backend = BACKEND, todo.id = %id))]
    async fn get_todo_by_id(&self, id: &TodoId) -> Result<Option<Todo>> {
        let start = Instant::now();
        let result = self.with_conn(|conn| Self::select_one(conn, id));
        record_operation_metrics(BACKEND, "get_todo_by_id", start, status_label(&result));
        result
    }

    #[instrument(skip(self, todo), fields(operation = "create_todo", backend = BACKEND))]
    async fn create_todo(&self, todo: NewTodo) -> Result<Todo> {
        let start = Instant::now();
        let result = self.ensure_ready().and_then(|()| todo.validate()).and_then(|()| {
            self.with_conn(|conn| {
                let record = Todo::from_new(todo, Timestamp::now());
                Self::insert(conn, &record)
            })
        });
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
        let result = self
            .ensure_ready()
            .and_then(|()| patch.validate())
            .and_then(|()| self.with_conn(|conn| Self::update(conn, id, patch)));
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
        let result = self.with_conn(|conn| {
            conn.execute("DELETE FROM todos WHERE id = ?1", params![id.as_str()])
                .map_err(|e| Error::operation("delete_todo", e))
        });
        if let Ok(deleted) = &result {
            self.publish(|meta| TodoEvent::Deleted {
                meta,
                id: id.clone(),
                existed: *deleted > 0,
            });
        }
        record_operation_metrics(BACKEND, "delete_todo", start, status_label(&result));
        result.map(|_| ())
    }
}
