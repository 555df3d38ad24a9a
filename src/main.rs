//! Binary entry point for todokit.
//!
//! A thin command-line front end over the storage layer: every run builds
//! one storage manager, waits for it to become ready, runs a single command
//! and shuts down.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow option_if_let_else for environment variable fallback chains
#![allow(clippy::option_if_let_else)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use todokit::cli::{self, AddArgs, UpdateArgs};
use todokit::observability;
use todokit::{Platform, StorageManager, TodoAdapter, TodokitConfig};

/// Todokit - local-first todo storage.
#[derive(Parser)]
#[command(name = "todokit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Force a platform instead of detecting it (web or native).
    #[arg(long, global = true)]
    platform: Option<Platform>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List todos, newest first.
    List {
        /// Print the records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one todo.
    Get {
        /// Todo id.
        id: String,
    },

    /// Create a todo.
    Add {
        /// Title.
        title: String,

        /// Description.
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium or high.
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Change fields of a todo.
    Update {
        /// Todo id.
        id: String,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New description.
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description.
        #[arg(long)]
        clear_description: bool,

        /// New priority.
        #[arg(long)]
        priority: Option<String>,

        /// New completion state.
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Flip the completed flag of a todo.
    Toggle {
        /// Todo id.
        id: String,
    },

    /// Delete a todo.
    Delete {
        /// Todo id.
        id: String,
    },

    /// Show the storage backend and record counts.
    Status,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.platform) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(config.logging.as_ref(), cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let manager = StorageManager::new(&config);
    if let Err(e) = manager.start().await {
        eprintln!("Storage unavailable ({}): {e}", manager.platform());
        return ExitCode::FAILURE;
    }

    let result = match manager.wait_ready().await {
        Ok(adapter) => run_command(cli.command, &adapter, &manager).await,
        Err(e) => Err(e),
    };
    manager.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    adapter: &Arc<dyn TodoAdapter>,
    manager: &StorageManager,
) -> todokit::Result<()> {
    let adapter = adapter.as_ref();
    let mut out = io::stdout().lock();

    match command {
        Commands::List { json } => cli::list(adapter, json, &mut out).await,
        Commands::Get { id } => cli::get(adapter, &id, &mut out).await,
        Commands::Add {
            title,
            description,
            priority,
        } => {
            let args = AddArgs {
                title,
                description,
                priority,
            };
            cli::add(adapter, args, &mut out).await.map(|_| ())
        },
        Commands::Update {
            id,
            title,
            description,
            clear_description,
            priority,
            completed,
        } => {
            let args = UpdateArgs {
                title,
                description,
                clear_description,
                priority,
                completed,
            };
            cli::update(adapter, &id, args, &mut out).await.map(|_| ())
        },
        Commands::Toggle { id } => cli::toggle(adapter, &id, &mut out).await.map(|_| ()),
        Commands::Delete { id } => cli::delete(adapter, &id, &mut out).await,
        Commands::Status => {
            writeln_platform(&mut out, manager.platform())?;
            cli::status(adapter, &manager.snapshot(), &mut out)
                .await
                .map(|_| ())
        },
    }
}

fn writeln_platform(out: &mut impl io::Write, platform: Platform) -> todokit::Result<()> {
    writeln!(out, "platform: {platform}").map_err(|e| todokit::Error::operation("write_output", e))
}

/// Loads configuration: file, then environment, then command-line flags.
fn load_config(path: Option<&Path>, platform: Option<Platform>) -> todokit::Result<TodokitConfig> {
    let config = if let Some(config_path) = path {
        TodokitConfig::load_from_file(config_path)?
    } else if let Some(config_path) = std::env::var("TODOKIT_CONFIG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        TodokitConfig::load_from_file(Path::new(&config_path))?
    } else {
        TodokitConfig::load_default()
    };

    let config = config.with_env_overrides()?;
    Ok(match platform {
        Some(platform) => config.with_platform(platform),
        None => config,
    })
}
