//! Frames exchanged with live viewer connections.
//!
//! Viewers send [`ControlMessage`]s to change what they receive; the hub
//! pushes [`HubFrame`]s. Both are JSON text frames.

use serde::{Deserialize, Serialize};

/// Event type for newly appended log bytes. Topic is the session id.
pub const LOG_CHUNK_EVENT: &str = "log_chunk";

/// Event type for newly detected sessions. Topic is [`ALL_LOGS_TOPIC`].
pub const NEW_LOG_EVENT: &str = "new_log";

/// Literal topic under which `new_log` events are published.
///
/// Not a wildcard: viewers subscribe to `("new_log", "*")` verbatim.
pub const ALL_LOGS_TOPIC: &str = "*";

/// Subscription change requested by a viewer.
///
/// ```json
/// {"type": "subscribe", "event": "log_chunk", "token": "srv_20250130-163356-470"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Start receiving `(event, token)`.
    Subscribe {
        /// Event type.
        event: String,
        /// Topic value.
        token: String,
    },
    /// Stop receiving `(event, token)`.
    Unsubscribe {
        /// Event type.
        event: String,
        /// Topic value.
        token: String,
    },
}

/// Notification pushed to every viewer subscribed to `(event, token)`.
#[derive(Debug, Serialize)]
pub struct HubFrame<'a, T: Serialize + ?Sized> {
    /// Event type.
    #[serde(rename = "type")]
    pub event: &'a str,
    /// Topic the event was published under.
    pub token: &'a str,
    /// Event body.
    pub payload: &'a T,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn control_message_parses_subscribe() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"subscribe","event":"new_log","token":"*"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::Subscribe {
                event: String::from(NEW_LOG_EVENT),
                token: String::from(ALL_LOGS_TOPIC),
            }
        );
    }

    #[test]
    fn control_message_rejects_unknown_type() {
        let msg: Result<ControlMessage, _> =
            serde_json::from_str(r#"{"type":"resume","event":"new_log","token":"*"}"#);
        assert!(msg.is_err());
    }

    #[test]
    fn frame_layout() {
        let frame = HubFrame {
            event: LOG_CHUNK_EVENT,
            token: "srv_1",
            payload: "L 01/30/2025 - 16:33:56: World triggered \"Round_Start\"\n",
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "log_chunk");
        assert_eq!(json["token"], "srv_1");
        assert!(json["payload"].as_str().unwrap().contains("Round_Start"));
    }
}
