//! Backend selection and the storage lifecycle.
//!
//! A [`StorageManager`] owns exactly one adapter, chosen from the
//! [`Platform`] when it is built. [`StorageManager::start`] runs the
//! adapter's initialization once and publishes every state change as a
//! [`StorageSnapshot`] over a `watch` channel:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready
//!                              \-> Failed
//! ```
//!
//! `Failed` is terminal; there is no retry. [`StorageManager::shutdown`]
//! drops the adapter handle and publishes `Uninitialized` again.

use super::Platform;
use super::adapters::{KeyValueTodoAdapter, SqliteTodoAdapter};
use super::kv::FileKeyValueStore;
use super::lock::acquire_lock;
use super::traits::TodoAdapter;
use crate::config::TodokitConfig;
use crate::observability::EventBus;
use crate::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Where the storage context is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not started, or shut down.
    Uninitialized,
    /// `initialize()` is in flight.
    Initializing,
    /// The adapter can serve CRUD calls.
    Ready,
    /// Initialization failed; the error is in the snapshot.
    Failed,
}

impl LifecycleState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What consumers observe: `{adapter, is_ready, error}`.
///
/// `adapter` is only present in the `Ready` state and `error` only in
/// `Failed`.
#[derive(Clone)]
pub struct StorageSnapshot {
    /// Lifecycle state.
    pub state: LifecycleState,
    /// The ready adapter.
    pub adapter: Option<Arc<dyn TodoAdapter>>,
    /// The initialization error.
    pub error: Option<Error>,
}

impl StorageSnapshot {
    const fn uninitialized() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            adapter: None,
            error: None,
        }
    }

    const fn initializing() -> Self {
        Self {
            state: LifecycleState::Initializing,
            adapter: None,
            error: None,
        }
    }

    fn ready(adapter: Arc<dyn TodoAdapter>) -> Self {
        Self {
            state: LifecycleState::Ready,
            adapter: Some(adapter),
            error: None,
        }
    }

    const fn failed(error: Error) -> Self {
        Self {
            state: LifecycleState::Failed,
            adapter: None,
            error: Some(error),
        }
    }

    /// True only in the `Ready` state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}

impl fmt::Debug for StorageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSnapshot")
            .field("state", &self.state)
            .field("adapter", &self.adapter.as_ref().map(|a| a.backend_name()))
            .field("error", &self.error)
            .finish()
    }
}

/// Builds the adapter for `platform` from configuration.
///
/// The returned adapter is not initialized.
#[must_use]
pub fn select_adapter(
    platform: Platform,
    config: &TodokitConfig,
    events: &EventBus,
) -> Arc<dyn TodoAdapter> {
    match platform {
        Platform::Web => {
            let store = FileKeyValueStore::new(config.kv_path());
            Arc::new(
                KeyValueTodoAdapter::new(store, config.storage_key.clone())
                    .with_events(events.clone()),
            )
        },
        Platform::Native => {
            Arc::new(SqliteTodoAdapter::new(config.sqlite_path()).with_events(events.clone()))
        },
    }
}

/// Owns one adapter and drives its lifecycle.
pub struct StorageManager {
    platform: Platform,
    adapter: Mutex<Option<Arc<dyn TodoAdapter>>>,
    events: EventBus,
    state: watch::Sender<StorageSnapshot>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl StorageManager {
    /// Selects a backend for the configured (or detected) platform.
    #[must_use]
    pub fn new(config: &TodokitConfig) -> Self {
        let platform = config.platform();
        let events = EventBus::default();
        let adapter = select_adapter(platform, config, &events);
        tracing::debug!(
            platform = %platform,
            backend = adapter.backend_name(),
            "Selected storage backend"
        );
        Self::with_adapter(platform, adapter, events)
    }

    /// Wraps an existing, uninitialized adapter.
    ///
    /// `events` is exposed through [`events`](Self::events); wiring the
    /// adapter to it is up to the caller.
    #[must_use]
    pub fn with_adapter(platform: Platform, adapter: Arc<dyn TodoAdapter>, events: EventBus) -> Self {
        let (state, _rx) = watch::channel(StorageSnapshot::uninitialized());
        Self {
            platform,
            adapter: Mutex::new(Some(adapter)),
            events,
            state,
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// The platform the backend was chosen for.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Change events from the managed adapter.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StorageSnapshot {
        self.state.borrow().clone()
    }

    /// True once initialization has succeeded (and until shutdown).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Subscribes to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StorageSnapshot> {
        self.state.subscribe()
    }

    /// Initializes the adapter and publishes the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if called more than once or after
    /// shutdown, or the adapter's initialization error.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState(
                "storage manager already started".to_string(),
            ));
        }

        let adapter = acquire_lock(&self.adapter)
            .clone()
            .ok_or_else(|| Error::InvalidState("storage manager is shut down".to_string()))?;
        let backend = adapter.backend_name();

        self.state.send_replace(StorageSnapshot::initializing());
        tracing::info!(platform = %self.platform, backend, "Initializing storage");

        match adapter.initialize().await {
            Ok(()) => {
                metrics::counter!("storage_initializations_total", "backend" => backend, "status" => "success")
                    .increment(1);
                tracing::info!(backend, "Storage ready");
                self.state.send_replace(StorageSnapshot::ready(adapter));
                Ok(())
            },
            Err(e) => {
                metrics::counter!("storage_initializations_total", "backend" => backend, "status" => "error")
                    .increment(1);
                tracing::error!(backend, error = %e, "Storage initialization failed");
                self.state.send_replace(StorageSnapshot::failed(e.clone()));
                Err(e)
            },
        }
    }

    /// Waits until the manager is ready or has failed.
    ///
    /// # Errors
    ///
    /// Returns the initialization error on failure, or
    /// [`Error::InvalidState`] if the manager is shut down.
    pub async fn wait_ready(&self) -> Result<Arc<dyn TodoAdapter>> {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|s| match s.state {
                LifecycleState::Ready | LifecycleState::Failed => true,
                LifecycleState::Initializing => false,
                LifecycleState::Uninitialized => self.closed.load(Ordering::Acquire),
            })
            .await;
        let snapshot = match settled {
            Ok(current) => current.clone(),
            Err(_) => return Err(Error::InvalidState("storage manager dropped".to_string())),
        };

        match snapshot.state {
            LifecycleState::Ready => snapshot
                .adapter
                .ok_or_else(|| Error::InvalidState("ready without an adapter".to_string())),
            LifecycleState::Failed => Err(snapshot.error.unwrap_or_else(|| {
                Error::InvalidState("failed without an error".to_string())
            })),
            LifecycleState::Uninitialized | LifecycleState::Initializing => Err(
                Error::InvalidState("storage manager is shut down".to_string()),
            ),
        }
    }

    /// Tears the context down and releases the adapter handle.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let released = acquire_lock(&self.adapter).take();
        self.state.send_replace(StorageSnapshot::uninitialized());
        if let Some(adapter) = released {
            tracing::debug!(backend = adapter.backend_name(), "Storage shut down");
        }
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("platform", &self.platform)
            .field("snapshot", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
