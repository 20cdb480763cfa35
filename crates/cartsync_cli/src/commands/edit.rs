//! Edit command implementation.

use crate::file_store::FileItemStore;
use cartsync_engine::{Item, ItemStore};
use std::path::Path;

/// Field changes requested on the command line.
///
/// `None` keeps the current value; `note: Some(None)` clears the note.
#[derive(Debug, Default)]
pub struct Changes {
    /// New name.
    pub name: Option<String>,
    /// New quantity.
    pub quantity: Option<u32>,
    /// New note, or `Some(None)` to clear it.
    pub note: Option<Option<String>>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.quantity.is_none() && self.note.is_none()
    }
}

/// Runs the edit command.
pub fn run(data: &Path, id: &str, changes: Changes) -> Result<(), Box<dyn std::error::Error>> {
    if changes.is_empty() {
        return Err("Nothing to change: pass --name, --quantity, --note or --clear-note".into());
    }

    let store = FileItemStore::open(data)?;
    let item = store.resolve(id)?;
    let updated = apply(&store, &item, changes)?;
    println!("Updated {}", super::describe(&updated));
    Ok(())
}

fn apply(
    store: &FileItemStore,
    item: &Item,
    changes: Changes,
) -> Result<Item, Box<dyn std::error::Error>> {
    let name = changes.name.unwrap_or_else(|| item.name.clone());
    let quantity = changes.quantity.unwrap_or(item.quantity);
    let note = changes.note.unwrap_or_else(|| item.note.clone());
    Ok(store.update(item, &name, quantity, note.as_deref())?)
}
