//! CLI command implementations.

pub mod add;
pub mod bought;
pub mod edit;
pub mod list;
pub mod remove;
pub mod sync;

use cartsync_engine::Item;

/// Number of id characters shown in text output.
const SHORT_ID_LEN: usize = 8;

/// Returns the leading characters of an item id for display.
pub fn short_id(item: &Item) -> &str {
    let id = item.sync_id.as_str();
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map(|(end, _)| &id[..end])
        .unwrap_or(id)
}

/// Formats an item as a single list line.
pub fn describe(item: &Item) -> String {
    let mark = if item.is_bought { "x" } else { " " };
    let mut line = format!("[{mark}] {}  {} x{}", short_id(item), item.name, item.quantity);
    if let Some(note) = &item.note {
        line.push_str(&format!("  ({note})"));
    }
    line
}
