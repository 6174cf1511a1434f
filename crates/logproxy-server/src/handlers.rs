//! REST endpoint handlers.
//!
//! Each handler extracts the shared [`AppState`] from the Axum state and
//! either feeds the reassembly engine or reads from the session store.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use logproxy_core::Disposition;
use logproxy_types::{LogSessionId, LogSummary};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::headers::{self, LOG_PARTIAL};
use crate::state::AppState;

/// Body returned for an accepted chunk.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// Session the chunk was assigned to.
    pub session_id: LogSessionId,
    /// Whether the chunk opened a new session.
    pub new_session: bool,
    /// What was stored.
    pub disposition: Disposition,
}

/// Ingest one log chunk.
///
/// # Route
///
/// `POST /api/logs`
///
/// # Errors
///
/// Returns `400` for missing or malformed headers and length mismatches,
/// `500` if storage fails.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let chunk = headers::parse_chunk(&headers, body).inspect_err(|e| {
        warn!(error = %e, "Rejected chunk headers");
    })?;
    let token = chunk.token().clone();

    let outcome = state.reassembler.submit_chunk(chunk).await.map_err(|e| {
        if e.is_rejection() {
            warn!(token = %token, error = %e, "Rejected chunk");
        } else {
            error!(token = %token, error = %e, "Failed to process chunk");
        }
        ApiError::from(e)
    })?;

    Ok(Json(IngestResponse {
        session_id: outcome.session_id,
        new_session: outcome.is_new_session,
        disposition: outcome.disposition,
    }))
}

/// Return the full reassembled log of one session as plain text.
///
/// Sets `X-Log-Partial: true` when the bytes on disk are not fully backed
/// by chunk records.
///
/// # Route
///
/// `GET /api/logs/{session_id}`
///
/// # Errors
///
/// Returns `400` for a malformed id, `404` if the session was never written.
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = LogSessionId::parse(&session_id)?;
    let contents = state.store.read_full_log(&id).await?;

    let mut response = ([(CONTENT_TYPE, "text/plain; charset=utf-8")], contents.bytes).into_response();
    if !contents.complete {
        response
            .headers_mut()
            .insert(LOG_PARTIAL, HeaderValue::from_static("true"));
    }
    Ok(response)
}

/// List every known session, most recent activity first.
///
/// # Route
///
/// `GET /api/listlogs`
///
/// # Errors
///
/// Returns `500` if the store cannot be read.
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LogSummary>>, ApiError> {
    Ok(Json(state.store.list_sessions().await?))
}

/// Admin view of the session listing.
///
/// # Route
///
/// `GET /api/admin/logs`
///
/// # Errors
///
/// Returns `500` if the store cannot be read.
pub async fn admin_logs(
    state: State<Arc<AppState>>,
) -> Result<Json<Vec<LogSummary>>, ApiError> {
    list_logs(state).await
}

/// Liveness probe.
///
/// # Route
///
/// `GET /healthz`
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "viewers": state.hub.connection_count(),
    }))
}
