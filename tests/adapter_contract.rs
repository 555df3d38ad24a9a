//! Behavior every `TodoAdapter` backend must share.
//!
//! Each check runs once against `SQLite` (in memory) and once against the
//! key-value backend (over an in-process store).
#![allow(clippy::panic, clippy::redundant_closure_for_method_calls)]

use std::time::Duration;
use todokit::storage::MemoryKeyValueStore;
use todokit::{
    Error, KeyValueStore, KeyValueTodoAdapter, NewTodo, Priority, SqliteTodoAdapter, SyncStatus,
    TodoAdapter, TodoId, TodoPatch,
};

async fn sqlite() -> Box<dyn TodoAdapter> {
    let adapter = SqliteTodoAdapter::in_memory();
    adapter.initialize().await.unwrap();
    Box::new(adapter)
}

async fn key_value() -> Box<dyn TodoAdapter> {
    let adapter = KeyValueTodoAdapter::new(MemoryKeyValueStore::new(), "todos_db");
    adapter.initialize().await.unwrap();
    Box::new(adapter)
}

async fn pause() {
    tokio::time::sleep(Duration::from_millis(2)).await;
}

async fn check_create_applies_defaults(adapter: &dyn TodoAdapter) {
    let todo = adapter.create_todo(NewTodo::new("Buy milk")).await.unwrap();

    assert!(!todo.id.as_str().is_empty());
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.description, None);
    assert!(!todo.completed);
    assert_eq!(todo.priority, Priority::Medium);
    assert_eq!(todo.sync_status, SyncStatus::Local);
    assert_eq!(todo.last_synced_at, None);
    assert_eq!(todo.created_at, todo.updated_at);
    assert!(todo.created_at.parse().is_some());
}

async fn check_create_keeps_supplied_fields(adapter: &dyn TodoAdapter) {
    let todo = adapter
        .create_todo(
            NewTodo::new("Call the bank")
                .with_id("fixed")
                .with_description("before noon")
                .with_priority(Priority::High)
                .with_completed(true),
        )
        .await
        .unwrap();

    assert_eq!(todo.id.as_str(), "fixed");
    assert_eq!(todo.description.as_deref(), Some("before noon"));
    assert_eq!(todo.priority, Priority::High);
    assert!(todo.completed);
}

async fn check_create_rejects_blank_title(adapter: &dyn TodoAdapter) {
    let err = adapter.create_todo(NewTodo::new("   ")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(adapter.get_todos().await.unwrap().is_empty());
}

async fn check_get_by_id_round_trip(adapter: &dyn TodoAdapter) {
    let created = adapter
        .create_todo(NewTodo::new("Round trip").with_description("d"))
        .await
        .unwrap();

    let fetched = adapter.get_todo_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, Some(created));

    let missing = adapter.get_todo_by_id(&TodoId::new("nope")).await.unwrap();
    assert_eq!(missing, None);
}

async fn check_update_moves_updated_at_forward(adapter: &dyn TodoAdapter) {
    let created = adapter.create_todo(NewTodo::new("Draft")).await.unwrap();

    // Back-to-back updates within one millisecond must still be ordered.
    let first = adapter
        .update_todo(&created.id, TodoPatch::new().with_title("Second draft"))
        .await
        .unwrap();
    let second = adapter
        .update_todo(&created.id, TodoPatch::new().with_completed(true))
        .await
        .unwrap();

    assert_eq!(first.id, created.id);
    assert_eq!(first.created_at, created.created_at);
    assert_eq!(second.created_at, created.created_at);
    assert!(first.updated_at.sort_key() > created.updated_at.sort_key());
    assert!(second.updated_at.sort_key() > first.updated_at.sort_key());
    assert_eq!(second.title, "Second draft");
    assert!(second.completed);
}

async fn check_update_missing_is_not_found(adapter: &dyn TodoAdapter) {
    let kept = adapter.create_todo(NewTodo::new("Untouched")).await.unwrap();
    let before = adapter.get_todos().await.unwrap();

    let err = adapter
        .update_todo(&TodoId::new("ghost"), TodoPatch::new().with_title("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(adapter.get_todos().await.unwrap(), before);
    assert_eq!(adapter.get_todo_by_id(&kept.id).await.unwrap(), Some(kept));
}

async fn check_update_rejects_blank_title(adapter: &dyn TodoAdapter) {
    let created = adapter.create_todo(NewTodo::new("Keep me")).await.unwrap();
    let err = adapter
        .update_todo(&created.id, TodoPatch::new().with_title(""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(adapter.get_todo_by_id(&created.id).await.unwrap(), Some(created));
}

async fn check_delete_is_idempotent(adapter: &dyn TodoAdapter) {
    let created = adapter.create_todo(NewTodo::new("Short-lived")).await.unwrap();

    adapter.delete_todo(&created.id).await.unwrap();
    assert_eq!(adapter.get_todo_by_id(&created.id).await.unwrap(), None);

    adapter.delete_todo(&created.id).await.unwrap();
    adapter.delete_todo(&TodoId::new("never-existed")).await.unwrap();
    assert!(adapter.get_todos().await.unwrap().is_empty());
}

async fn check_toggle_flips_completed(adapter: &dyn TodoAdapter) {
    let created = adapter.create_todo(NewTodo::new("Flip")).await.unwrap();

    let on = adapter.toggle_todo(&created.id).await.unwrap();
    assert!(on.completed);
    let off = adapter.toggle_todo(&created.id).await.unwrap();
    assert!(!off.completed);

    let err = adapter.toggle_todo(&TodoId::new("ghost")).await.unwrap_err();
    assert!(err.is_not_found());
}

/// Create A, B, C; update B; delete A; the list is C then B.
async fn check_newest_first_lifecycle(adapter: &dyn TodoAdapter) {
    let a = adapter.create_todo(NewTodo::new("A")).await.unwrap();
    pause().await;
    let b = adapter.create_todo(NewTodo::new("B")).await.unwrap();
    pause().await;
    let c = adapter.create_todo(NewTodo::new("C")).await.unwrap();

    let titles: Vec<String> = adapter
        .get_todos()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["C", "B", "A"]);

    pause().await;
    let updated_b = adapter
        .update_todo(&b.id, TodoPatch::new().with_completed(true))
        .await
        .unwrap();
    adapter.delete_todo(&a.id).await.unwrap();

    let todos = adapter.get_todos().await.unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0], c);
    assert_eq!(todos[1], updated_b);
    assert!(todos[1].completed);
    // Updating B does not move it ahead of C.
    assert_eq!(todos[1].created_at, b.created_at);
}

macro_rules! contract_tests {
    ($backend:ident) => {
        mod $backend {
            use super::*;

            #[tokio::test]
            async fn create_applies_defaults() {
                check_create_applies_defaults(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn create_keeps_supplied_fields() {
                check_create_keeps_supplied_fields(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn create_rejects_blank_title() {
                check_create_rejects_blank_title(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn get_by_id_round_trip() {
                check_get_by_id_round_trip(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn update_moves_updated_at_forward() {
                check_update_moves_updated_at_forward(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn update_missing_is_not_found() {
                check_update_missing_is_not_found(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn update_rejects_blank_title() {
                check_update_rejects_blank_title(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn delete_is_idempotent() {
                check_delete_is_idempotent(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn toggle_flips_completed() {
                check_toggle_flips_completed(super::$backend().await.as_ref()).await;
            }

            #[tokio::test]
            async fn newest_first_lifecycle() {
                check_newest_first_lifecycle(super::$backend().await.as_ref()).await;
            }
        }
    };
}

contract_tests!(sqlite);
contract_tests!(key_value);

#[tokio::test]
async fn key_value_corrupt_blob_starts_empty() {
    let store = MemoryKeyValueStore::new();
    store.set_item("todos_db", "{not json").unwrap();

    let adapter = KeyValueTodoAdapter::new(store.clone(), "todos_db");
    adapter.initialize().await.unwrap();

    assert!(adapter.is_ready());
    assert!(adapter.get_todos().await.unwrap().is_empty());

    // The next write replaces the unreadable blob.
    adapter.create_todo(NewTodo::new("fresh")).await.unwrap();
    let raw = store.get_item("todos_db").unwrap().unwrap();
    assert!(raw.starts_with('['));
}

#[tokio::test]
async fn key_value_bad_fields_keep_every_record() {
    let store = MemoryKeyValueStore::new();
    store
        .set_item(
            "todos_db",
            r#"[
                {"id":"keep","title":"valid","completed":true,"priority":"high",
                 "createdAt":"2026-03-01T10:00:00.000Z","updatedAt":"2026-03-01T10:00:00.000Z"},
                {"id":"nodate","title":"null date","createdAt":null,"completed":null},
                {"id":"odd","title":"odd priority","priority":"urgent","createdAt":"2026-02-01T10:00:00.000Z"},
                {"title":"no id at all"}
            ]"#,
        )
        .unwrap();

    let adapter = KeyValueTodoAdapter::new(store.clone(), "todos_db");
    adapter.initialize().await.unwrap();

    let todos = adapter.get_todos().await.unwrap();
    let ids: Vec<&str> = todos.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["keep", "odd", "nodate"]);
    assert_eq!(todos[0].priority, Priority::High);
    assert!(todos[0].completed);
    assert_eq!(todos[1].priority, Priority::Medium);
    assert!(!todos[2].completed);
    assert_eq!(todos[2].created_at.sort_key(), 0);

    // Rewriting the blob keeps the records that loaded.
    adapter.create_todo(NewTodo::new("new")).await.unwrap();
    let reloaded = KeyValueTodoAdapter::new(store, "todos_db");
    reloaded.initialize().await.unwrap();
    let mut titles: Vec<String> = reloaded
        .get_todos()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["new", "null date", "odd priority", "valid"]);
}

#[tokio::test]
async fn key_value_unparseable_timestamps_sort_last() {
    let store = MemoryKeyValueStore::new();
    store
        .set_item(
            "todos_db",
            r#"[
                {"id":"old","title":"no date","createdAt":"yesterday-ish"},
                {"id":"new","title":"dated","createdAt":"2026-03-01T10:00:00.000Z"}
            ]"#,
        )
        .unwrap();

    let adapter = KeyValueTodoAdapter::new(store, "todos_db");
    adapter.initialize().await.unwrap();

    let ids: Vec<String> = adapter
        .get_todos()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn crud_before_initialize_is_not_ready() {
    let backends: Vec<Box<dyn TodoAdapter>> = vec![
        Box::new(SqliteTodoAdapter::in_memory()),
        Box::new(KeyValueTodoAdapter::new(MemoryKeyValueStore::new(), "todos_db")),
    ];

    for adapter in backends {
        assert!(!adapter.is_ready());
        // Readiness is checked before input validation.
        let err = adapter.create_todo(NewTodo::new("")).await.unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }), "{err}");
        let err = adapter.get_todos().await.unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }), "{err}");
        let err = adapter
            .update_todo(&TodoId::new("x"), TodoPatch::new().with_completed(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }), "{err}");
        let err = adapter
            .update_todo(&TodoId::new("x"), TodoPatch::new().with_title(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }), "{err}");
    }
}
