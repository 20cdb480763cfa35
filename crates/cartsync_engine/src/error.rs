//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for local store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a transport call.
///
/// Every variant except [`TransportError::Cancelled`] is retried under the
/// same backoff policy; a 404 is retried exactly like a dropped connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The response was not something the protocol can interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with a non-success status.
    #[error("server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The payload could not be encoded or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The call did not complete.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// A pending retry was abandoned because the engine shut down.
    #[error("sync cancelled")]
    Cancelled,
}

impl TransportError {
    /// Creates a server error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Cancelled)
    }

    /// Returns the HTTP status code, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<cartsync_protocol::ProtocolError> for TransportError {
    fn from(err: cartsync_protocol::ProtocolError) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Errors raised by the local item store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Field validation failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced item does not exist.
    #[error("item not found: {0}")]
    NotFound(String),

    /// An item with this sync id already exists.
    #[error("item already exists: {0}")]
    AlreadyExists(String),

    /// The backing storage failed.
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Errors that can end a sync cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Fetch or upload failed after all retries.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading or writing local items failed.
    #[error("local store error: {0}")]
    LocalStore(#[from] StoreError),
}

impl SyncError {
    /// Returns true if the cycle ended because the engine shut down.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Transport(TransportError::Cancelled))
    }
}
