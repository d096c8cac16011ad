//! # Error Types
//!
//! Defines error types used by the blob codec and the tx-extra parser.

use thiserror::Error;

/// Errors raised while decoding or encoding chain blobs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The blob is not a valid encoding of the expected entity.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The entity could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// The blob decoded but did not consume every byte.
    #[error("Trailing bytes: decoded {consumed} of {total} bytes")]
    TrailingBytes { consumed: u64, total: u64 },

    /// A tx-extra field ran past the end of the extra bytes.
    #[error("Truncated tx-extra field with tag {tag:#04x}")]
    TruncatedExtra { tag: u8 },

    /// A tx-extra tag this node does not understand.
    #[error("Unknown tx-extra tag {0:#04x}")]
    UnknownExtraTag(u8),

    /// Padding contained non-zero bytes or exceeded its maximum length.
    #[error("Invalid tx-extra padding")]
    InvalidPadding,
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
