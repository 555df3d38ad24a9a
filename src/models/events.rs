//! Change events emitted by storage adapters.

use super::{Todo, TodoId};
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Backend that produced the event.
    pub source: &'static str,
    /// Event time (Unix epoch milliseconds).
    pub timestamp_ms: i64,
}

impl EventMeta {
    /// Creates event metadata stamped with the current time.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self::with_timestamp(source, chrono::Utc::now().timestamp_millis())
    }

    /// Creates event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(source: &'static str, timestamp_ms: i64) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp_ms,
        }
    }
}

/// Events emitted after a mutation has been persisted.
#[derive(Debug, Clone)]
pub enum TodoEvent {
    /// A todo was created.
    Created {
        /// Event metadata.
        meta: EventMeta,
        /// The stored record.
        todo: Todo,
    },
    /// A todo was updated.
    Updated {
        /// Event metadata.
        meta: EventMeta,
        /// The record after the update.
        todo: Todo,
    },
    /// A delete was issued (the id may not have existed).
    Deleted {
        /// Event metadata.
        meta: EventMeta,
        /// The deleted id.
        id: TodoId,
        /// Whether a record was actually removed.
        existed: bool,
    },
}

impl TodoEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::Created { meta, .. } | Self::Updated { meta, .. } | Self::Deleted { meta, .. } => {
                meta
            },
        }
    }

    /// Returns the id of the affected todo.
    #[must_use]
    pub const fn todo_id(&self) -> &TodoId {
        match self {
            Self::Created { todo, .. } | Self::Updated { todo, .. } => &todo.id,
            Self::Deleted { id, .. } => id,
        }
    }
}
