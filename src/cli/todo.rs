//! Record commands.

use crate::models::{NewTodo, Priority, Todo, TodoId, TodoPatch};
use crate::storage::TodoAdapter;
use crate::{Error, Result};
use std::io::Write;

/// Fields for `add`.
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Priority name.
    pub priority: Option<String>,
}

/// Fields for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Clear the description.
    pub clear_description: bool,
    /// New priority name.
    pub priority: Option<String>,
    /// New completion state.
    pub completed: Option<bool>,
}

impl UpdateArgs {
    fn into_patch(self) -> Result<TodoPatch> {
        let mut patch = TodoPatch::new();
        if let Some(title) = self.title {
            patch = patch.with_title(title);
        }
        if self.clear_description {
            patch = patch.with_description(None);
        } else if let Some(description) = self.description {
            patch = patch.with_description(Some(description));
        }
        if let Some(priority) = self.priority {
            patch = patch.with_priority(priority.parse::<Priority>()?);
        }
        if let Some(completed) = self.completed {
            patch = patch.with_completed(completed);
        }
        Ok(patch)
    }
}

fn io_error(e: std::io::Error) -> Error {
    Error::operation("write_output", e)
}

/// One line per record: `[x] title  (priority, id)`.
fn write_line(out: &mut impl Write, todo: &Todo) -> Result<()> {
    let mark = if todo.completed { "x" } else { " " };
    writeln!(
        out,
        "[{mark}] {}  ({}, {})",
        todo.title, todo.priority, todo.id
    )
    .map_err(io_error)
}

fn write_detail(out: &mut impl Write, todo: &Todo) -> Result<()> {
    let description = todo.description.as_deref().unwrap_or("-");
    writeln!(out, "id:          {}", todo.id).map_err(io_error)?;
    writeln!(out, "title:       {}", todo.title).map_err(io_error)?;
    writeln!(out, "description: {description}").map_err(io_error)?;
    writeln!(out, "completed:   {}", todo.completed).map_err(io_error)?;
    writeln!(out, "priority:    {}", todo.priority).map_err(io_error)?;
    writeln!(out, "created:     {}", todo.created_at).map_err(io_error)?;
    writeln!(out, "updated:     {}", todo.updated_at).map_err(io_error)?;
    writeln!(out, "sync:        {}", todo.sync_status).map_err(io_error)
}

/// Lists every todo, newest first.
///
/// # Errors
///
/// Returns an error if the adapter or the writer fails.
pub async fn list(adapter: &dyn TodoAdapter, json: bool, out: &mut impl Write) -> Result<()> {
    let todos = adapter.get_todos().await?;

    if json {
        let text = serde_json::to_string_pretty(&todos)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        return writeln!(out, "{text}").map_err(io_error);
    }

    if todos.is_empty() {
        return writeln!(out, "No todos.").map_err(io_error);
    }
    for todo in &todos {
        write_line(out, todo)?;
    }
    Ok(())
}

/// Shows one todo.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the id is unknown.
pub async fn get(adapter: &dyn TodoAdapter, id: &str, out: &mut impl Write) -> Result<()> {
    let id = TodoId::new(id);
    let todo = adapter
        .get_todo_by_id(&id)
        .await?
        .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
    write_detail(out, &todo)
}

/// Creates a todo and prints its id.
///
/// # Errors
///
/// Returns an error for a blank title or unknown priority.
pub async fn add(adapter: &dyn TodoAdapter, args: AddArgs, out: &mut impl Write) -> Result<Todo> {
    let mut new = NewTodo::new(args.title);
    if let Some(description) = args.description {
        new = new.with_description(description);
    }
    if let Some(priority) = args.priority {
        new = new.with_priority(priority.parse()?);
    }

    let todo = adapter.create_todo(new).await?;
    writeln!(out, "Created {}", todo.id).map_err(io_error)?;
    Ok(todo)
}

/// Applies field changes to a todo.
///
/// # Errors
///
/// Returns an error if nothing would change, the id is unknown, or a value
/// is invalid.
pub async fn update(
    adapter: &dyn TodoAdapter,
    id: &str,
    args: UpdateArgs,
    out: &mut impl Write,
) -> Result<Todo> {
    let patch = args.into_patch()?;
    if patch.is_empty() {
        return Err(Error::InvalidInput("nothing to update".to_string()));
    }

    let todo = adapter.update_todo(&TodoId::new(id), patch).await?;
    write_line(out, &todo)?;
    Ok(todo)
}

/// Flips the completed flag.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the id is unknown.
pub async fn toggle(adapter: &dyn TodoAdapter, id: &str, out: &mut impl Write) -> Result<Todo> {
    let todo = adapter.toggle_todo(&TodoId::new(id)).await?;
    write_line(out, &todo)?;
    Ok(todo)
}

/// Deletes a todo. Unknown ids are reported, not an error.
///
/// # Errors
///
/// Returns an error if the adapter or the writer fails.
pub async fn delete(adapter: &dyn TodoAdapter, id: &str, out: &mut impl Write) -> Result<()> {
    let id = TodoId::new(id);
    let existed = adapter.get_todo_by_id(&id).await?.is_some();
    adapter.delete_todo(&id).await?;

    if existed {
        writeln!(out, "Deleted {id}").map_err(io_error)
    } else {
        writeln!(out, "No todo with id {id}").map_err(io_error)
    }
}
