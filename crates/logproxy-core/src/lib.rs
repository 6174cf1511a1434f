//! Chunk reassembly and session correlation for the log proxy.
//!
//! Game servers push their log as a stream of self-describing chunks, each
//! carrying the byte range it covers. This crate decides which logical
//! session a chunk belongs to, strips whatever part of it is already
//! stored, appends the rest durably, and tells listeners what changed.
//!
//! # Pipeline
//!
//! ```text
//! IncomingChunk
//!     |
//!     +-- lock token ------------> FileStore::lock_token
//!     +-- correlate session -----> ServerState (offset + 2h window + map)
//!     +-- plan append -----------> ChunkRecords (new / re-send suffix / duplicate)
//!     +-- persist + append ------> FileStore
//!     +-- notify ----------------> ReassemblyListener (Hub)
//! ```
//!
//! # Modules
//!
//! - [`chunk`] -- [`IncomingChunk`], a validated inbound chunk
//! - [`correlation`] -- Pure session-matching and overlap decisions
//! - [`listener`] -- [`ReassemblyListener`] trait and its hub implementation
//! - [`reassembler`] -- [`Reassembler`], the engine itself
//! - [`error`] -- Shared error types
//!
//! [`IncomingChunk`]: chunk::IncomingChunk
//! [`ReassemblyListener`]: listener::ReassemblyListener
//! [`Reassembler`]: reassembler::Reassembler

pub mod chunk;
pub mod correlation;
pub mod error;
pub mod listener;
pub mod reassembler;

// Re-export primary types for convenience.
pub use chunk::IncomingChunk;
pub use error::ReassemblyError;
pub use listener::{NoOpListener, ReassemblyListener};
pub use reassembler::{ChunkOutcome, DEFAULT_CORRELATION_WINDOW, Disposition, Reassembler};
