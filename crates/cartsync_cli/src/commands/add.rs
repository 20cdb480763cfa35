//! Add command implementation.

use crate::file_store::FileItemStore;
use cartsync_engine::ItemStore;
use std::path::Path;

/// Runs the add command.
pub fn run(
    data: &Path,
    name: &str,
    quantity: u32,
    note: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileItemStore::open(data)?;
    let item = store.create(name, quantity, note)?;
    println!("Added {}", super::describe(&item));
    Ok(())
}
