//! Local shopping-list items.

use crate::error::{StoreError, StoreResult};
use cartsync_protocol::RemoteItem;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable sync identity of an item.
///
/// Generated once when the item is created locally and never reused. Items
/// created from a remote record keep the remote id so both replicas keep
/// referring to the same logical item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generates a fresh identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identity (e.g. one received from the server).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shopping-list item in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable sync identity.
    pub sync_id: ItemId,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Quantity to buy, always positive.
    pub quantity: u32,
    /// Optional note; never blank.
    pub note: Option<String>,
    /// Whether the item has been bought.
    pub is_bought: bool,
    /// Creation time, fixed for the life of the item.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation, bought toggles included.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Builds a new item with validated fields and both timestamps at `now`.
    ///
    /// Timestamps are kept at millisecond precision, the precision of the
    /// data file and the wire.
    pub fn new(
        sync_id: ItemId,
        name: &str,
        quantity: u32,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Self> {
        let (name, quantity, note) = validate_fields(name, quantity, note)?;
        let now = now.trunc_subsecs(3);
        Ok(Self {
            sync_id,
            name,
            quantity,
            note,
            is_bought: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the editable fields and bumps `updated_at`.
    pub fn edit(
        &mut self,
        name: &str,
        quantity: u32,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let (name, quantity, note) = validate_fields(name, quantity, note)?;
        self.name = name;
        self.quantity = quantity;
        self.note = note;
        self.touch(now);
        Ok(())
    }

    /// Sets the bought flag and bumps `updated_at`.
    pub fn mark_bought(&mut self, bought: bool, now: DateTime<Utc>) {
        self.is_bought = bought;
        self.touch(now);
    }

    /// Moves `updated_at` strictly forward, to `now` if the clock allows.
    ///
    /// Two mutations within the same millisecond still get distinct
    /// timestamps, so the later one wins on the server.
    fn touch(&mut self, now: DateTime<Utc>) {
        let next = self
            .updated_at
            .checked_add_signed(TimeDelta::milliseconds(1))
            .unwrap_or(self.updated_at);
        self.updated_at = now.trunc_subsecs(3).max(next.trunc_subsecs(3));
    }

    /// Converts to the wire form.
    pub fn to_remote(&self) -> RemoteItem {
        RemoteItem {
            id: self.sync_id.as_str().to_string(),
            name: self.name.clone(),
            quantity: self.quantity,
            note: self.note.clone(),
            is_bought: self.is_bought,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Validates and normalizes editable item fields.
///
/// The name is trimmed and must not be empty, the quantity must be positive,
/// and a blank note becomes `None`.
pub(crate) fn validate_fields(
    name: &str,
    quantity: u32,
    note: Option<&str>,
) -> StoreResult<(String, u32, Option<String>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput("name must not be empty".into()));
    }
    if quantity == 0 {
        return Err(StoreError::InvalidInput(
            "quantity must be greater than zero".into(),
        ));
    }
    let note = note
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string);
    Ok((name.to_string(), quantity, note))
}
