//! Server-side item ledger.

use cartsync_protocol::{RemoteItem, Watermark};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A stored item together with the time the server accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Latest accepted copy.
    pub item: RemoteItem,
    /// Server time at which this copy was accepted.
    pub received_at: DateTime<Utc>,
}

/// Latest copy of every item the server has seen.
///
/// The ledger maintains:
/// - One entry per item id, replaced only by a copy with a later `updated_at`
/// - A strictly increasing server clock, stamped on every accepted copy and
///   on every fetch checkpoint
///
/// Because no two operations share a tick, an item accepted after a fetch
/// always carries a receipt time later than the watermark that fetch
/// returned, even within the same millisecond.
#[derive(Debug)]
pub struct ItemLedger {
    state: RwLock<LedgerState>,
}

#[derive(Debug)]
struct LedgerState {
    entries: HashMap<String, LedgerEntry>,
    last_tick: DateTime<Utc>,
}

impl LedgerState {
    fn tick(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let next = self
            .last_tick
            .checked_add_signed(TimeDelta::milliseconds(1))
            .unwrap_or(self.last_tick);
        self.last_tick = now.max(next);
        self.last_tick
    }
}

impl ItemLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState {
                entries: HashMap::new(),
                last_tick: DateTime::<Utc>::MIN_UTC,
            }),
        }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if the ledger holds no items.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Returns the entry for `id`.
    pub fn get(&self, id: &str) -> Option<LedgerEntry> {
        self.state.read().entries.get(id).cloned()
    }

    /// Returns every item accepted strictly after `watermark`, oldest
    /// receipt first, and the checkpoint to use as the next watermark.
    pub fn changed_since(
        &self,
        watermark: Watermark,
        now: DateTime<Utc>,
    ) -> (Vec<RemoteItem>, Watermark) {
        let mut state = self.state.write();
        let checkpoint = state.tick(now);

        let mut changed: Vec<&LedgerEntry> = state
            .entries
            .values()
            .filter(|entry| entry.received_at > watermark.at())
            .collect();
        changed.sort_by(|a, b| by_receipt(a, b));

        let items = changed.into_iter().map(|entry| entry.item.clone()).collect();
        (items, Watermark::new(checkpoint))
    }

    /// Merges an uploaded batch, keeping the later `updated_at` per id.
    ///
    /// Returns how many copies were accepted; ties and older copies are
    /// ignored.
    pub fn upsert(&self, items: Vec<RemoteItem>, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write();
        let received_at = state.tick(now);
        let mut accepted = 0;

        for item in items {
            let newer = state
                .entries
                .get(&item.id)
                .is_none_or(|stored| item.updated_at > stored.item.updated_at);
            if newer {
                state
                    .entries
                    .insert(item.id.clone(), LedgerEntry { item, received_at });
                accepted += 1;
            }
        }

        accepted
    }

    /// Returns all entries, oldest receipt first.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.state.read().entries.values().cloned().collect();
        entries.sort_by(by_receipt);
        entries
    }
}

fn by_receipt(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    a.received_at
        .cmp(&b.received_at)
        .then_with(|| a.item.id.cmp(&b.item.id))
}

impl Default for ItemLedger {
    fn default() -> Self {
        Self::new()
    }
}
