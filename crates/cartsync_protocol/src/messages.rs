//! Protocol messages for sync.

use crate::error::{ProtocolError, ProtocolResult};
use crate::item::RemoteItem;
use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};

/// Header carrying the client's watermark on fetch.
pub const WATERMARK_HEADER: &str = "X-Last-Sync-Timestamp";

/// Path of the items resource, relative to the server base URL.
pub const ITEMS_PATH: &str = "/items";

/// Server response to a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Items changed on the server since the requested watermark, in server order.
    pub items: Vec<RemoteItem>,
    /// The point the server considers synchronized.
    pub last_sync_timestamp: Watermark,
}

impl SyncResponse {
    /// Creates a new response.
    pub fn new(items: Vec<RemoteItem>, last_sync_timestamp: Watermark) -> Self {
        Self {
            items,
            last_sync_timestamp,
        }
    }

    /// Creates a response with no items.
    pub fn empty(last_sync_timestamp: Watermark) -> Self {
        Self::new(Vec::new(), last_sync_timestamp)
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// Client upload of its full local item set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Every local item.
    pub items: Vec<RemoteItem>,
    /// The watermark the client held when the cycle started.
    pub last_sync_timestamp: Watermark,
}

impl UploadRequest {
    /// Creates a new upload request.
    pub fn new(items: Vec<RemoteItem>, last_sync_timestamp: Watermark) -> Self {
        Self {
            items,
            last_sync_timestamp,
        }
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
