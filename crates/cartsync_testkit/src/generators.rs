//! Property-based test generators using proptest.
//!
//! Provides strategies for generating items that satisfy the model's
//! invariants (non-blank names, positive quantities, `updated_at` not
//! before `created_at`).

use crate::fixtures::millis;
use cartsync_engine::{Item, ItemId};
use cartsync_protocol::RemoteItem;
use chrono::{DateTime, Utc};
use proptest::prelude::*;

/// Upper bound (exclusive) of generated timestamps, in milliseconds.
pub const MAX_TEST_MILLIS: i64 = 1_000_000;

/// Strategy for generating item ids.
pub fn item_id_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}"
}

/// Strategy for generating valid item names.
pub fn item_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]([A-Za-z ]{0,14}[A-Za-z])?"
}

/// Strategy for generating optional notes.
pub fn note_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,12}")
}

/// Strategy for generating timestamps.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0..MAX_TEST_MILLIS).prop_map(millis)
}

/// Strategy for generating a `(created_at, updated_at)` pair with
/// `created_at <= updated_at`.
pub fn timestamps_strategy() -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (0..MAX_TEST_MILLIS, 0..MAX_TEST_MILLIS).prop_map(|(a, b)| (millis(a.min(b)), millis(a.max(b))))
}

/// Strategy for generating valid remote items.
pub fn remote_item_strategy() -> impl Strategy<Value = RemoteItem> {
    (
        item_id_strategy(),
        item_name_strategy(),
        1u32..100,
        note_strategy(),
        any::<bool>(),
        timestamps_strategy(),
    )
        .prop_map(|(id, name, quantity, note, is_bought, (created_at, updated_at))| RemoteItem {
            id,
            name,
            quantity,
            note,
            is_bought,
            created_at,
            updated_at,
        })
}

/// Strategy for generating valid local items.
pub fn local_item_strategy() -> impl Strategy<Value = Item> {
    remote_item_strategy().prop_map(|remote| Item {
        sync_id: ItemId::from_string(remote.id),
        name: remote.name,
        quantity: remote.quantity,
        note: remote.note,
        is_bought: remote.is_bought,
        created_at: remote.created_at,
        updated_at: remote.updated_at,
    })
}

/// Strategy for generating a batch of remote items, ids possibly repeated.
pub fn remote_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<RemoteItem>> {
    prop::collection::vec(remote_item_strategy(), 0..=max_len)
}

/// Strategy for generating local items with distinct ids.
pub fn local_set_strategy(max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(local_item_strategy(), 0..=max_len).prop_map(|items| {
        let mut seen = std::collections::HashSet::new();
        items
            .into_iter()
            .filter(|item| seen.insert(item.sync_id.clone()))
            .collect()
    })
}

/// Strategy for generating a local item and a remote copy of the same id
/// with independent content and timestamps.
pub fn conflicting_pair_strategy() -> impl Strategy<Value = (Item, RemoteItem)> {
    (local_item_strategy(), remote_item_strategy()).prop_map(|(local, mut remote)| {
        remote.id = local.sync_id.to_string();
        (local, remote)
    })
}
