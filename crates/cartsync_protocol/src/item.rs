//! Wire form of a shopping-list item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shopping-list item as transmitted between client and server.
///
/// Keyed by the same identity (`id`) as the local item it mirrors, so a
/// local and a remote record for the same logical item can be correlated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Stable sync identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Quantity to buy.
    pub quantity: u32,
    /// Optional free-text note.
    #[serde(default)]
    pub note: Option<String>,
    /// Whether the item has been bought.
    #[serde(default)]
    pub is_bought: bool,
    /// Creation time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Last modification time; the only input to conflict resolution.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl RemoteItem {
    /// Returns true if the content fields are usable as a local item
    /// (non-blank name, positive quantity).
    pub fn has_valid_content(&self) -> bool {
        !self.name.trim().is_empty() && self.quantity > 0
    }
}
