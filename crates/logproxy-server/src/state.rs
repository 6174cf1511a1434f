//! Shared application state for the API server.
//!
//! [`AppState`] owns the session store, the broadcast hub and the
//! reassembly engine wired between them. One instance is created at
//! startup and shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use logproxy_core::Reassembler;
use logproxy_hub::Hub;
use logproxy_store::{FileStore, StoreError};

use crate::config::ProxyConfig;

/// Default request body limit when none is configured.
pub const DEFAULT_BODY_LIMIT: usize = 8_388_608;

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct AppState {
    /// Chunk reassembly engine.
    pub reassembler: Reassembler,
    /// Session store, for read-only queries.
    pub store: Arc<FileStore>,
    /// Live viewer hub.
    pub hub: Arc<Hub>,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl AppState {
    /// Wire an engine between `store` and `hub` with default settings.
    pub fn new(store: Arc<FileStore>, hub: Arc<Hub>) -> Self {
        let reassembler = Reassembler::new(Arc::clone(&store), hub.clone());
        Self {
            reassembler,
            store,
            hub,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Open the store and build the hub described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the data directory cannot be created.
    pub async fn from_config(config: &ProxyConfig) -> Result<Self, StoreError> {
        let store = Arc::new(FileStore::open(&config.storage.data_dir).await?);
        let hub = Hub::new(config.hub.client_buffer);
        Ok(Self::new(store, hub)
            .with_correlation_window(config.reassembly.correlation_window())
            .with_body_limit(config.server.max_body_bytes))
    }

    /// Override the correlation window.
    #[must_use]
    pub fn with_correlation_window(mut self, window: Duration) -> Self {
        self.reassembler = self.reassembler.with_correlation_window(window);
        self
    }

    /// Override the request body limit.
    #[must_use]
    pub const fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}
