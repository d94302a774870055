//! Shared application state for all routes. The registry is fixed once serving starts.

use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::ChannelHub;
use crate::config::{Settings, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_WS_BUFFER};
use crate::model::ModelRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub hub: Arc<ChannelHub>,
    /// Upper bound on one accessor call.
    pub fetch_timeout: Duration,
}

impl AppState {
    pub fn new(registry: ModelRegistry, settings: &Settings) -> Self {
        Self {
            registry: Arc::new(registry),
            hub: Arc::new(ChannelHub::new(settings.ws_buffer)),
            fetch_timeout: settings.fetch_timeout,
        }
    }

    /// State with default limits, for embedding and tests.
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            hub: Arc::new(ChannelHub::new(DEFAULT_WS_BUFFER)),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}
