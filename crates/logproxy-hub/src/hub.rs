//! Connection registry and topic index.
//!
//! The hub keeps two views of the same subscriptions: per topic, the set
//! of interested connections (used by [`Hub::publish`]), and per
//! connection, the set of topics it asked for (used to clean up on
//! disconnect without scanning every topic). Both are mutated together
//! under a single hub-wide lock; every operation is O(1) or
//! O(subscribers of one topic).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use logproxy_types::{ConnectionId, HubFrame};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::subscriber::Subscriber;

/// Default capacity of each viewer's outbound buffer, in frames.
pub const DEFAULT_CLIENT_BUFFER: usize = 256;

/// One encoded JSON frame, shared by every viewer it is delivered to.
pub type Frame = Arc<str>;

/// An `(event type, topic)` pair.
///
/// Topics are matched literally; `"*"` is an ordinary topic value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    /// Event type, e.g. `log_chunk`.
    pub event: String,
    /// Topic value, e.g. a session id or `*`.
    pub topic: String,
}

impl Topic {
    /// Build a topic key.
    pub fn new(event: &str, topic: &str) -> Self {
        Self {
            event: event.to_owned(),
            topic: topic.to_owned(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event, self.topic)
    }
}

/// A registered viewer.
#[derive(Debug)]
struct Connection {
    tx: mpsc::Sender<Frame>,
    subscriptions: HashSet<Topic>,
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl Registry {
    /// Drop a connection and every index entry pointing at it.
    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(&id) else {
            return false;
        };
        for topic in connection.subscriptions {
            self.detach(&topic, id);
        }
        true
    }

    /// Remove `id` from the subscriber set of `topic`, dropping the set
    /// once it is empty.
    fn detach(&mut self, topic: &Topic, id: ConnectionId) {
        if let Some(ids) = self.topics.get_mut(topic) {
            ids.remove(&id);
            if ids.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Registry of live viewer connections and their subscriptions.
///
/// Created once at service start and shared behind an [`Arc`].
#[derive(Debug)]
pub struct Hub {
    registry: Mutex<Registry>,
    client_buffer: usize,
}

impl Hub {
    /// Create a hub whose viewers buffer up to `client_buffer` frames.
    pub fn new(client_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            client_buffer: client_buffer.max(1),
        })
    }

    /// Register a new viewer with an empty subscription set.
    ///
    /// Dropping the returned [`Subscriber`] disconnects it.
    pub fn connect(self: &Arc<Self>) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.client_buffer);
        let id = ConnectionId::new();
        self.lock().connections.insert(
            id,
            Connection {
                tx,
                subscriptions: HashSet::new(),
            },
        );
        debug!(connection = %id, "Viewer connected");
        Subscriber::new(id, rx, Arc::downgrade(self))
    }

    /// Subscribe `id` to `(event, topic)`.
    ///
    /// Subscribing twice is a no-op. Returns `false` if `id` is not (or no
    /// longer) connected.
    pub fn subscribe(&self, id: ConnectionId, event: &str, topic: &str) -> bool {
        let key = Topic::new(event, topic);
        let mut registry = self.lock();
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        connection.subscriptions.insert(key.clone());
        registry.topics.entry(key).or_default().insert(id);
        debug!(connection = %id, event, topic, "Viewer subscribed");
        true
    }

    /// Unsubscribe `id` from `(event, topic)`.
    ///
    /// Removing a subscription that does not exist is a no-op. Returns
    /// `false` if `id` is not (or no longer) connected.
    pub fn unsubscribe(&self, id: ConnectionId, event: &str, topic: &str) -> bool {
        let key = Topic::new(event, topic);
        let mut registry = self.lock();
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        connection.subscriptions.remove(&key);
        registry.detach(&key, id);
        debug!(connection = %id, event, topic, "Viewer unsubscribed");
        true
    }

    /// Remove `id` and all of its subscriptions in one step.
    ///
    /// Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(id);
        if removed {
            debug!(connection = %id, "Viewer disconnected");
        }
        removed
    }

    /// Deliver `payload` to every viewer subscribed to exactly
    /// `(event, topic)`.
    ///
    /// Never blocks and never fails: viewers whose buffer is full miss
    /// this frame, viewers whose receiver is gone are pruned. Returns the
    /// number of viewers the frame was queued for.
    pub fn publish<T: Serialize + ?Sized>(&self, event: &str, topic: &str, payload: &T) -> usize {
        let key = Topic::new(event, topic);
        if !self.lock().topics.contains_key(&key) {
            return 0;
        }

        let frame: Frame = match serde_json::to_string(&HubFrame {
            event,
            token: topic,
            payload,
        }) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(%key, error = %e, "Failed to encode hub frame");
                return 0;
            }
        };

        let mut guard = self.lock();
        let registry = &mut *guard;
        let Some(ids) = registry.topics.get(&key) else {
            return 0;
        };

        let mut delivered: usize = 0;
        let mut closed = Vec::new();
        for id in ids {
            let Some(connection) = registry.connections.get(id) else {
                continue;
            };
            match connection.tx.try_send(Arc::clone(&frame)) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(TrySendError::Full(_)) => {
                    debug!(connection = %id, %key, "Viewer buffer full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            registry.remove(id);
            debug!(connection = %id, "Pruned closed viewer");
        }
        delivered
    }

    /// Drop every connection. Their subscribers observe end-of-stream.
    pub fn shutdown(&self) {
        let mut registry = self.lock();
        let count = registry.connections.len();
        registry.connections.clear();
        registry.topics.clear();
        debug!(count, "Hub shut down");
    }

    /// Number of connected viewers.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Number of `(event, topic)` pairs with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.lock().topics.len()
    }

    /// Subscriptions currently held by `id`, sorted.
    pub fn subscriptions_of(&self, id: ConnectionId) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self
            .lock()
            .connections
            .get(&id)
            .map(|c| c.subscriptions.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            client_buffer: DEFAULT_CLIENT_BUFFER,
        }
    }
}
