//! Notification seam between the engine and whatever fans events out.

use logproxy_hub::Hub;
use logproxy_types::{ALL_LOGS_TOPIC, LOG_CHUNK_EVENT, LogSessionId, LogSummary, NEW_LOG_EVENT};
use tracing::trace;

/// Receives reassembly events after they are durable.
///
/// Called while the token's lock is held, so events for one token arrive in
/// commit order. Implementations must not block.
pub trait ReassemblyListener: Send + Sync {
    /// Bytes were appended to `session`.
    fn chunk_appended(&self, session: &LogSessionId, bytes: &[u8]);

    /// A new session was detected.
    fn session_opened(&self, summary: &LogSummary);
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl ReassemblyListener for NoOpListener {
    fn chunk_appended(&self, _session: &LogSessionId, _bytes: &[u8]) {}

    fn session_opened(&self, _summary: &LogSummary) {}
}

/// Publishes `log_chunk` to the session's topic and `new_log` to
/// [`ALL_LOGS_TOPIC`].
///
/// Chunk bytes are sent as text with lossy UTF-8 decoding, one chunk at a
/// time. A multi-byte character split across two chunks therefore reaches
/// viewers as U+FFFD on each side of the cut. The stored log keeps the
/// original bytes.
impl ReassemblyListener for Hub {
    fn chunk_appended(&self, session: &LogSessionId, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let delivered = self.publish(LOG_CHUNK_EVENT, session.as_str(), &*text);
        trace!(session_id = %session, delivered, "Published log_chunk");
    }

    fn session_opened(&self, summary: &LogSummary) {
        let delivered = self.publish(NEW_LOG_EVENT, ALL_LOGS_TOPIC, summary);
        trace!(session_id = %summary.session_id, delivered, "Published new_log");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn split_character_is_replaced_in_published_text() {
        let hub = Hub::new(4);
        let session = LogSessionId::parse("srv_20250130-163356-470").unwrap();
        let mut viewer = hub.connect();
        hub.subscribe(viewer.id(), LOG_CHUNK_EVENT, session.as_str());

        let text = "Player \u{e9}\n".as_bytes();
        let (head, tail) = text.split_at(8);
        hub.chunk_appended(&session, head);
        hub.chunk_appended(&session, tail);

        let first: serde_json::Value = serde_json::from_str(&viewer.try_recv().unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&viewer.try_recv().unwrap()).unwrap();
        assert_eq!(first["payload"], "Player \u{fffd}");
        assert_eq!(second["payload"], "\u{fffd}\n");
    }
}
