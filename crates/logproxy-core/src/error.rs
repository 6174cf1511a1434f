//! Error types for the reassembly engine.

use logproxy_store::StoreError;
use logproxy_types::TypesError;

/// Errors that can occur while submitting a chunk.
#[derive(Debug, thiserror::Error)]
pub enum ReassemblyError {
    /// A raw field could not be turned into its typed form.
    #[error("validation error: {0}")]
    Validation(#[from] TypesError),

    /// The payload length disagrees with the declared byte range.
    #[error("payload is {actual} bytes but declared range {begin}..{end} is {declared}")]
    LengthMismatch {
        /// Declared begin offset.
        begin: u64,
        /// Declared end offset.
        end: u64,
        /// Length implied by the declared range.
        declared: u64,
        /// Length of the received payload.
        actual: u64,
    },

    /// A chunk's offsets do not line up with the bytes already stored.
    #[error(
        "chunk {begin}..{end} ({payload_len} bytes) does not line up with \
         stored bytes ending at {stored_end}"
    )]
    MalformedOffsets {
        /// Declared begin offset.
        begin: u64,
        /// Declared end offset.
        end: u64,
        /// End of the stored bytes the chunk was measured against.
        stored_end: u64,
        /// Length of the received payload.
        payload_len: usize,
    },

    /// The session store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The storage mutation task panicked or was aborted.
    #[error("reassembly task failed: {0}")]
    Task(String),
}

impl ReassemblyError {
    /// Whether the chunk itself was at fault (as opposed to storage).
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::LengthMismatch { .. } | Self::MalformedOffsets { .. }
        )
    }
}
