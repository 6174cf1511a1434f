//! Ingest, query and live-view API server for the log proxy.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Ingest endpoint** (`POST /api/logs`) accepting raw log chunks
//!   described by game-server headers
//! - **Query endpoints** for reading a reassembled log and listing
//!   sessions (`/api/logs/{id}`, `/api/listlogs`, `/api/admin/logs`)
//! - **`WebSocket` endpoint** (`/ws`) where viewers subscribe to
//!   `(event, topic)` pairs and receive live frames from the hub
//! - **Liveness probe** (`/healthz`)
//!
//! # Architecture
//!
//! Every ingest request is handed to the shared [`Reassembler`], which
//! serialises work per server token and publishes to the [`Hub`]. Each
//! viewer connection runs one reader task (control messages) and one
//! writer task (hub frames); when either ends both are torn down and the
//! viewer is removed from the hub.
//!
//! [`Reassembler`]: logproxy_core::Reassembler
//! [`Hub`]: logproxy_hub::Hub

pub mod config;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{ConfigError, ProxyConfig, ServerConfig};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
