//! Local item store interface.

use crate::error::{StoreError, StoreResult};
use crate::item::{Item, ItemId};
use chrono::Utc;
use parking_lot::RwLock;

/// CRUD surface over persisted items.
///
/// Each call either fully succeeds or leaves the store unchanged. The engine
/// does not group calls into larger transactions. Implementations own the
/// clock: every mutation stamps `updated_at` itself.
pub trait ItemStore: Send + Sync {
    /// Returns every item.
    fn fetch_all(&self) -> StoreResult<Vec<Item>>;

    /// Creates an item with a fresh sync id.
    fn create(&self, name: &str, quantity: u32, note: Option<&str>) -> StoreResult<Item>;

    /// Creates an item under an existing sync id (an item first seen remotely).
    fn create_with_id(
        &self,
        sync_id: &ItemId,
        name: &str,
        quantity: u32,
        note: Option<&str>,
    ) -> StoreResult<Item>;

    /// Replaces the editable fields of `item`.
    fn update(&self, item: &Item, name: &str, quantity: u32, note: Option<&str>)
        -> StoreResult<Item>;

    /// Removes `item`.
    fn delete(&self, item: &Item) -> StoreResult<()>;

    /// Sets the bought flag of `item`.
    fn set_bought(&self, item: &Item, bought: bool) -> StoreResult<Item>;
}

/// An in-memory item store.
///
/// Items are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `items` as-is.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Inserts a fully formed item, timestamps included.
    pub fn insert(&self, item: Item) -> StoreResult<()> {
        let mut items = self.items.write();
        if items.iter().any(|existing| existing.sync_id == item.sync_id) {
            return Err(StoreError::AlreadyExists(item.sync_id.to_string()));
        }
        items.push(item);
        Ok(())
    }

    /// Looks up an item by sync id.
    pub fn get(&self, sync_id: &ItemId) -> Option<Item> {
        self.items
            .read()
            .iter()
            .find(|item| &item.sync_id == sync_id)
            .cloned()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn modify<F>(&self, sync_id: &ItemId, change: F) -> StoreResult<Item>
    where
        F: FnOnce(&mut Item) -> StoreResult<()>,
    {
        let mut items = self.items.write();
        let slot = items
            .iter_mut()
            .find(|item| &item.sync_id == sync_id)
            .ok_or_else(|| StoreError::NotFound(sync_id.to_string()))?;
        // Work on a copy so a failed change leaves the stored item intact.
        let mut updated = slot.clone();
        change(&mut updated)?;
        *slot = updated.clone();
        Ok(updated)
    }
}

impl ItemStore for MemoryItemStore {
    fn fetch_all(&self) -> StoreResult<Vec<Item>> {
        Ok(self.items.read().clone())
    }

    fn create(&self, name: &str, quantity: u32, note: Option<&str>) -> StoreResult<Item> {
        self.create_with_id(&ItemId::generate(), name, quantity, note)
    }

    fn create_with_id(
        &self,
        sync_id: &ItemId,
        name: &str,
        quantity: u32,
        note: Option<&str>,
    ) -> StoreResult<Item> {
        let item = Item::new(sync_id.clone(), name, quantity, note, Utc::now())?;
        self.insert(item.clone())?;
        Ok(item)
    }

    fn update(
        &self,
        item: &Item,
        name: &str,
        quantity: u32,
        note: Option<&str>,
    ) -> StoreResult<Item> {
        self.modify(&item.sync_id, |stored| {
            stored.edit(name, quantity, note, Utc::now())
        })
    }

    fn delete(&self, item: &Item) -> StoreResult<()> {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|existing| existing.sync_id != item.sync_id);
        if items.len() == before {
            return Err(StoreError::NotFound(item.sync_id.to_string()));
        }
        Ok(())
    }

    fn set_bought(&self, item: &Item, bought: bool) -> StoreResult<Item> {
        self.modify(&item.sync_id, |stored| {
            stored.mark_bought(bought, Utc::now());
            Ok(())
        })
    }
}
