//! Broadcast hub for live log viewers.
//!
//! Each viewer connection registers with the [`Hub`], subscribes to any
//! number of `(event type, topic)` pairs, and receives every frame
//! published under exactly those pairs. Delivery never blocks the
//! publisher: each viewer has a bounded buffer and frames that do not fit
//! are dropped for that viewer only.
//!
//! ```text
//! Reassembler --publish("log_chunk", session_id)--> Hub --try_send--> viewer buffers
//! viewer --subscribe/unsubscribe--> Hub (registry + topic index)
//! ```
//!
//! # Modules
//!
//! - [`hub`] -- [`Hub`], the registry and topic index
//! - [`subscriber`] -- [`Subscriber`], the per-connection receiving handle

pub mod hub;
pub mod subscriber;

// Re-export primary types for convenience.
pub use hub::{DEFAULT_CLIENT_BUFFER, Frame, Hub, Topic};
pub use subscriber::Subscriber;
