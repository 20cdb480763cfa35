//! Item fixtures.
//!
//! Timestamps are given in milliseconds since the Unix epoch so tests can
//! state orderings directly.

use cartsync_engine::{Item, ItemId, MemoryItemStore};
use cartsync_protocol::RemoteItem;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// Returns the instant `ms` milliseconds after the epoch.
pub fn millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .expect("timestamp out of range")
}

/// A remote item with quantity 1, created at the epoch.
pub fn remote_item(id: &str, name: &str, updated_ms: i64) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        quantity: 1,
        note: None,
        is_bought: false,
        created_at: millis(0),
        updated_at: millis(updated_ms),
    }
}

/// A local item with quantity 1, created at the epoch.
pub fn local_item(id: &str, name: &str, updated_ms: i64) -> Item {
    Item {
        sync_id: ItemId::from_string(id),
        name: name.to_string(),
        quantity: 1,
        note: None,
        is_bought: false,
        created_at: millis(0),
        updated_at: millis(updated_ms),
    }
}

/// An in-memory store pre-populated with `items`.
pub fn store_with(items: Vec<Item>) -> Arc<MemoryItemStore> {
    Arc::new(MemoryItemStore::with_items(items))
}
