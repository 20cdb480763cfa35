//! Error types for the sync server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Invalid request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upload batch exceeds the configured limit.
    #[error("too many items: {count} > {max}")]
    BatchTooLarge {
        /// Items in the rejected upload.
        count: usize,
        /// Configured limit.
        max: usize,
    },

    /// No endpoint at this path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The endpoint exists but not for this method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::BatchTooLarge { .. } => 413,
            ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<cartsync_protocol::ProtocolError> for ServerError {
    fn from(err: cartsync_protocol::ProtocolError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}
