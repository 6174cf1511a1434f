//! `WebSocket` handler for live log viewers.
//!
//! Clients connect to `GET /ws` and send control frames to choose what
//! they receive:
//!
//! ```json
//! {"type": "subscribe", "event": "new_log", "token": "*"}
//! {"type": "subscribe", "event": "log_chunk", "token": "<session id>"}
//! ```
//!
//! Each connection runs a writer task draining its hub subscriber and a
//! reader task applying control frames. Malformed control frames are
//! ignored. When either task ends the other is aborted and the viewer is
//! removed from the hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use logproxy_hub::Hub;
use logproxy_types::{ConnectionId, ControlMessage};
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a viewer `WebSocket`.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_viewer(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_viewer(socket, state))
}

async fn handle_viewer(socket: WebSocket, state: Arc<AppState>) {
    let mut subscriber = state.hub.connect();
    let id = subscriber.id();
    debug!(connection = %id, "WebSocket viewer opened");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = subscriber.recv().await {
            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                debug!(connection = %id, "Viewer send failed");
                break;
            }
        }
        // Hub shut down or client gone; try to say goodbye.
        if sink.close().await.is_err() {
            debug!(connection = %id, "Viewer close failed");
        }
    });

    let hub = Arc::clone(&state.hub);
    let mut reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    apply_control(&hub, id, text.as_str());
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!(connection = %id, "WebSocket error: {e}");
                    break;
                }
                Ok(_) => {
                    // Ping/pong is handled by the protocol layer; binary is ignored.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    state.hub.disconnect(id);
    debug!(connection = %id, "WebSocket viewer closed");
}

/// Apply one raw control frame from viewer `id`.
///
/// Returns `true` if the frame was understood.
pub fn apply_control(hub: &Hub, id: ConnectionId, raw: &str) -> bool {
    match serde_json::from_str::<ControlMessage>(raw) {
        Ok(ControlMessage::Subscribe { event, token }) => {
            hub.subscribe(id, &event, &token);
            true
        }
        Ok(ControlMessage::Unsubscribe { event, token }) => {
            hub.unsubscribe(id, &event, &token);
            true
        }
        Err(e) => {
            debug!(connection = %id, error = %e, "Ignoring malformed control frame");
            false
        }
    }
}
