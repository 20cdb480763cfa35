//! Remove command implementation.

use crate::file_store::FileItemStore;
use cartsync_engine::ItemStore;
use std::path::Path;

/// Runs the remove command.
///
/// The deletion is local to this device. If the server still has the item
/// it comes back on the next sync.
pub fn run(data: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileItemStore::open(data)?;
    let item = store.resolve(id)?;
    store.delete(&item)?;
    println!("Removed {}", super::describe(&item));
    Ok(())
}
