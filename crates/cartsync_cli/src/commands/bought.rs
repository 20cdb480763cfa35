//! Bought command implementation.

use crate::file_store::FileItemStore;
use cartsync_engine::ItemStore;
use std::path::Path;

/// Runs the bought command.
pub fn run(data: &Path, id: &str, bought: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileItemStore::open(data)?;
    let item = store.resolve(id)?;
    let item = store.set_bought(&item, bought)?;
    println!("{}", super::describe(&item));
    Ok(())
}
