//! Log proxy binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`logproxy.yaml` + environment overrides)
//! 2. Initialize structured logging (tracing)
//! 3. Open the session store and create the viewer hub
//! 4. Serve HTTP + `WebSocket` until shutdown

use std::sync::Arc;

use logproxy_server::{AppState, ProxyConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the log proxy.
///
/// # Errors
///
/// Returns an error if configuration, storage setup or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = ProxyConfig::load()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        host = config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir.display(),
        correlation_window_secs = config.reassembly.correlation_window_secs,
        "logproxy starting"
    );

    // 3. Open storage and the hub.
    let state = Arc::new(AppState::from_config(&config).await?);

    // 4. Serve.
    start_server(&config.server, state).await?;

    info!("logproxy stopped");
    Ok(())
}
