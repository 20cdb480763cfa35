//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A message could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A message body could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A watermark header value was not an epoch-millisecond integer
    /// inside the representable range.
    #[error("invalid watermark: {0}")]
    InvalidWatermark(String),
}
