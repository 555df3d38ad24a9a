//! CLI command implementations.
//!
//! Commands only see an `Arc<dyn TodoAdapter>`; the binary owns the
//! [`StorageManager`](crate::StorageManager) that produced it. Output goes
//! to any [`Write`](std::io::Write) so commands can be exercised in tests.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `list` | List todos, newest first |
//! | `get` | Show one todo |
//! | `add` | Create a todo |
//! | `update` | Change fields of a todo |
//! | `toggle` | Flip the completed flag |
//! | `delete` | Remove a todo |
//! | `status` | Show backend and record counts |
//!
//! # Example Usage
//!
//! ```bash
//! todokit add "Renew passport" -p high
//! todokit list
//! todokit --platform web list --json
//! ```

mod status;
mod todo;

pub use status::{StatusReport, status};
pub use todo::{AddArgs, UpdateArgs, add, delete, get, list, toggle, update};
