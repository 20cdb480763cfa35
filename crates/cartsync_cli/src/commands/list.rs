//! List command implementation.

use crate::file_store::FileItemStore;
use cartsync_engine::{Item, ItemStore};
use clap::ValueEnum;
use std::path::Path;

/// Output format of the list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per item.
    #[default]
    Text,
    /// Pretty-printed JSON array.
    Json,
}

/// Runs the list command.
pub fn run(data: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileItemStore::open(data)?;
    let items = sorted(store.fetch_all()?);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => print_text_output(&items, &store),
    }

    Ok(())
}

/// Open items first, then bought ones, each by name.
fn sorted(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by(|a, b| {
        a.is_bought
            .cmp(&b.is_bought)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    items
}

fn print_text_output(items: &[Item], store: &FileItemStore) {
    if items.is_empty() {
        println!("The list is empty.");
    }
    for item in items {
        println!("{}", super::describe(item));
    }

    let watermark = store.watermark();
    if watermark.is_beginning() {
        println!("\nNever synced.");
    } else {
        println!("\nLast synced: {}", watermark.at().to_rfc3339());
    }
}
