//! Application state for API handlers

use agora_dispatch::Dispatcher;
use agora_engine::LifecycleController;
use agora_store::Store;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend, used directly by the auth middleware
    pub store: Arc<dyn Store>,

    /// The lifecycle controller every handler goes through
    pub engine: LifecycleController,

    /// Dispatcher handle, drained on shutdown
    pub dispatcher: Dispatcher,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, engine: LifecycleController, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            engine,
            dispatcher,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Human-readable uptime
    pub fn uptime(&self) -> String {
        let elapsed = chrono::Utc::now() - self.started_at;
        format!(
            "{}h {}m {}s",
            elapsed.num_hours(),
            elapsed.num_minutes() % 60,
            elapsed.num_seconds() % 60
        )
    }
}
