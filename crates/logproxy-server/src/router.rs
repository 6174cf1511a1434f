//! Axum router construction for the proxy API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS, request tracing and a request body limit.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the proxy.
///
/// The router includes:
/// - `POST /api/logs` -- ingest one chunk
/// - `GET /api/logs/{session_id}` -- full reassembled log
/// - `GET /api/listlogs` -- session listing
/// - `GET /api/admin/logs` -- session listing (admin prefix)
/// - `GET /ws` -- live viewer `WebSocket`
/// - `GET /healthz` -- liveness probe
///
/// Bodies larger than [`AppState::body_limit`] are rejected with `413`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Ingest + query
        .route("/api/logs", post(handlers::ingest))
        .route("/api/logs/{session_id}", get(handlers::get_log))
        .route("/api/listlogs", get(handlers::list_logs))
        .route("/api/admin/logs", get(handlers::admin_logs))
        // WebSocket
        .route("/ws", get(ws::ws_viewer))
        // Probes
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
