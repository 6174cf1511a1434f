//! Durable storage for reassembled game-server logs.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! {data_dir}/
//!     servers/{token}.json               ServerState (sessions of one token)
//!     sessions/{session_id}.log          append-only byte log
//!     sessions/{session_id}.chunks.json  ChunkRecord list
//! ```
//!
//! JSON documents are replaced wholesale through a temp file and a rename,
//! so a reader never sees a half-written document. Byte logs are only ever
//! appended to.
//!
//! # Modules
//!
//! - [`file_store`] -- [`FileStore`], the store itself
//! - [`locks`] -- Per-token write serialization
//! - [`error`] -- Shared error types

pub mod error;
pub mod file_store;
mod layout;
pub mod locks;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file_store::{FileStore, LogContents};
pub use locks::{TokenGuard, TokenLocks};
