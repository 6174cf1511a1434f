//! Receiving side of one viewer connection.

use std::sync::Weak;

use logproxy_types::ConnectionId;
use tokio::sync::mpsc;

use crate::hub::{Frame, Hub};

/// Handle returned by [`Hub::connect`].
///
/// Yields the frames published to this viewer's subscriptions, in publish
/// order. Dropping it removes the viewer and all of its subscriptions from
/// the hub.
#[derive(Debug)]
pub struct Subscriber {
    id: ConnectionId,
    rx: mpsc::Receiver<Frame>,
    hub: Weak<Hub>,
}

impl Subscriber {
    pub(crate) const fn new(id: ConnectionId, rx: mpsc::Receiver<Frame>, hub: Weak<Hub>) -> Self {
        Self { id, rx, hub }
    }

    /// Identity used for subscribe/unsubscribe calls on the hub.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next frame. `None` once the hub has dropped this
    /// connection.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Take the next frame if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.disconnect(self.id);
        }
    }
}
