//! Shared type definitions for the game-server log proxy.
//!
//! This crate is the single source of truth for the data model that flows
//! between the session store, the reassembly engine, the broadcast hub and
//! the HTTP boundary. It has no I/O of its own.
//!
//! # Modules
//!
//! - [`ids`] -- Validated identifiers (server tokens, session ids, viewer connections)
//! - [`time`] -- Game-server timestamp parsing and formatting
//! - [`structs`] -- Persisted records (server state, sessions, chunk records)
//! - [`wire`] -- Live-view frames exchanged with viewer connections
//! - [`error`] -- Validation errors

pub mod error;
pub mod ids;
pub mod structs;
pub mod time;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use error::TypesError;
pub use ids::{ConnectionId, LogSessionId, ServerToken};
pub use structs::{ByteRange, ChunkRecord, GameState, LogSession, LogSummary, ServerState};
pub use time::LogTimestamp;
pub use wire::{ALL_LOGS_TOPIC, ControlMessage, HubFrame, LOG_CHUNK_EVENT, NEW_LOG_EVENT};
