//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building or framing protocol values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A mandatory application info field was empty.
    #[error("application info field `{0}` must not be empty")]
    MissingAppInfo(&'static str),

    /// Length prefix announces a frame larger than [`crate::MAX_FRAME_SIZE`].
    #[error("frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Announced frame size.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    /// Fewer bytes than the length prefix announced.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes announced by the prefix (or prefix size itself).
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// CBOR serialization failed.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decoding failed: {0}")]
    Decode(String),
}
