//! Server configuration.

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of items accepted in one upload.
    pub max_upload_batch: usize,
    /// Whether uploads containing items with a blank name or zero quantity
    /// are rejected.
    pub validate_items: bool,
}

impl ServerConfig {
    /// Creates a new server configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_upload_batch: 1000,
            validate_items: true,
        }
    }

    /// Sets the maximum upload batch size.
    pub fn with_max_upload_batch(mut self, size: usize) -> Self {
        self.max_upload_batch = size;
        self
    }

    /// Enables or disables item validation on upload.
    pub fn with_validate_items(mut self, enabled: bool) -> Self {
        self.validate_items = enabled;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
