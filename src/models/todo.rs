//! Todo records, insert fields and partial updates.

use super::{Priority, SyncStatus, Timestamp};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a todo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Creates a todo ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TodoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TodoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A stored todo record.
///
/// Field names serialize in camelCase, which is the shape of the key-value
/// blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier, assigned on creation and never changed.
    pub id: TodoId,
    /// Required, non-empty title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    /// Whether the todo is done.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: bool,
    /// Priority, `medium` unless set.
    #[serde(default, deserialize_with = "lenient::priority")]
    pub priority: Priority,
    /// Set once when the record is created.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Timestamp,
    /// Refreshed on every mutation.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Timestamp,
    /// Cloud sync state (always `local` for now).
    #[serde(default, deserialize_with = "lenient::sync_status")]
    pub sync_status: SyncStatus,
    /// When the record was last synced, if ever.
    #[serde(default, deserialize_with = "lenient::optional_timestamp")]
    pub last_synced_at: Option<Timestamp>,
}

/// Field decoders for records written by other tools.
///
/// Only `id` and `title` are required. Every other field falls back to its
/// default on `null`, a wrong JSON type or an unknown enum value, matching
/// the column fallbacks of the `SQLite` row mapping.
mod lenient {
    use super::{Priority, SyncStatus, Timestamp};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        })
    }

    pub fn priority<'de, D: Deserializer<'de>>(d: D) -> Result<Priority, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Priority::parse(&s).unwrap_or_default(),
            _ => Priority::default(),
        })
    }

    pub fn sync_status<'de, D: Deserializer<'de>>(d: D) -> Result<SyncStatus, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => SyncStatus::parse(&s).unwrap_or_default(),
            _ => SyncStatus::default(),
        })
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        Ok(optional_timestamp(d)?.unwrap_or_default())
    }

    pub fn optional_timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(Timestamp::new(s)),
            _ => None,
        })
    }
}

impl Todo {
    /// Builds a new record from insert fields.
    ///
    /// Uses the caller-supplied id when present, otherwise generates one.
    /// Both timestamps are set to `now`.
    #[must_use]
    pub fn from_new(new: NewTodo, now: Timestamp) -> Self {
        Self {
            id: new.id.unwrap_or_else(TodoId::generate),
            title: new.title,
            description: new.description,
            completed: new.completed.unwrap_or(false),
            priority: new.priority.unwrap_or_default(),
            created_at: now.clone(),
            updated_at: now,
            sync_status: SyncStatus::Local,
            last_synced_at: None,
        }
    }

    /// Merges a patch into this record.
    ///
    /// `id` and `created_at` are never touched; `updated_at` becomes
    /// `updated_at`.
    pub fn apply(&mut self, patch: TodoPatch, updated_at: Timestamp) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.updated_at = updated_at;
    }
}

/// Fields for creating a todo.
///
/// Omitted fields take their defaults: `completed = false`,
/// `priority = medium`, generated `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    /// Caller-chosen id; generated when `None`.
    #[serde(default)]
    pub id: Option<TodoId>,
    /// Title (required, non-blank).
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial completion state.
    #[serde(default)]
    pub completed: Option<bool>,
    /// Initial priority.
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl NewTodo {
    /// Creates insert fields with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TodoId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the completion state.
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Checks the fields before anything is written.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(id) = &self.id {
            if id.as_str().trim().is_empty() {
                return Err(Error::InvalidInput("id must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// A partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    /// New title.
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    /// New completion state.
    pub completed: Option<bool>,
    /// New priority.
    pub priority: Option<Priority>,
}

impl TodoPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets or clears the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the completion state.
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
    }

    /// Checks the fields before anything is written.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_new_applies_defaults() {
        let now = Timestamp::now();
        let todo = Todo::from_new(NewTodo::new("Buy milk"), now.clone());

        assert!(!todo.id.as_str().is_empty());
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.description, None);
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.created_at, now);
        assert_eq!(todo.updated_at, now);
        assert_eq!(todo.sync_status, SyncStatus::Local);
        assert_eq!(todo.last_synced_at, None);
    }

    #[test]
    fn test_from_new_keeps_supplied_id() {
        let todo = Todo::from_new(NewTodo::new("x").with_id("fixed-id"), Timestamp::now());
        assert_eq!(todo.id.as_str(), "fixed-id");
    }

    #[test]
    fn test_apply_preserves_identity() {
        let created = Timestamp::new("2026-01-01T00:00:00.000Z");
        let mut todo = Todo::from_new(
            NewTodo::new("Old").with_description("keep me"),
            created.clone(),
        );
        let id = todo.id.clone();
        let later = Timestamp::new("2026-01-02T00:00:00.000Z");

        todo.apply(
            TodoPatch::new().with_title("New").with_priority(Priority::High),
            later.clone(),
        );

        assert_eq!(todo.id, id);
        assert_eq!(todo.created_at, created);
        assert_eq!(todo.updated_at, later);
        assert_eq!(todo.title, "New");
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.description.as_deref(), Some("keep me"));
    }

    #[test]
    fn test_apply_clears_description() {
        let mut todo = Todo::from_new(NewTodo::new("t").with_description("d"), Timestamp::now());
        todo.apply(TodoPatch::new().with_description(None), Timestamp::now());
        assert_eq!(todo.description, None);
    }

    #[test]
    fn test_validate_rejects_blank_titles() {
        assert!(NewTodo::new("").validate().is_err());
        assert!(NewTodo::new("   ").validate().is_err());
        assert!(NewTodo::new("ok").validate().is_ok());
        assert!(NewTodo::new("ok").with_id("").validate().is_err());
        assert!(TodoPatch::new().with_title(" ").validate().is_err());
        assert!(TodoPatch::new().validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let todo = Todo::from_new(NewTodo::new("t").with_id("a"), Timestamp::new("2026-01-01T00:00:00.000Z"));
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["createdAt"], "2026-01-01T00:00:00.000Z");
        assert_eq!(json["syncStatus"], "local");
        assert_eq!(json["priority"], "medium");
        assert!(json["lastSyncedAt"].is_null());
    }

    #[test]
    fn test_deserializes_sparse_record() {
        let todo: Todo = serde_json::from_str(r#"{"id":"x","title":"sparse"}"#).unwrap();
        assert_eq!(todo.created_at.sort_key(), 0);
        assert_eq!(todo.priority, Priority::Medium);
        assert!(!todo.completed);
    }

    #[test]
    fn test_deserializes_null_and_unknown_fields_to_defaults() {
        let todo: Todo = serde_json::from_str(
            r#"{
                "id": "x",
                "title": "messy",
                "description": 42,
                "completed": null,
                "priority": "urgent",
                "createdAt": null,
                "updatedAt": 1700000000,
                "syncStatus": "exploded",
                "lastSyncedAt": false
            }"#,
        )
        .unwrap();

        assert_eq!(todo.description, None);
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.created_at.sort_key(), 0);
        assert_eq!(todo.updated_at, Timestamp::default());
        assert_eq!(todo.sync_status, SyncStatus::Local);
        assert_eq!(todo.last_synced_at, None);
    }

    #[test]
    fn test_deserialize_requires_id_and_title() {
        assert!(serde_json::from_str::<Todo>(r#"{"title":"no id"}"#).is_err());
        assert!(serde_json::from_str::<Todo>(r#"{"id":"no-title"}"#).is_err());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TodoPatch::new().is_empty());
        assert!(!TodoPatch::new().with_completed(true).is_empty());
    }
}
