//! # CartSync Protocol
//!
//! Wire types and JSON codecs for CartSync.
//!
//! This crate provides:
//! - `RemoteItem`, the wire form of a shopping-list item
//! - `SyncResponse` and `UploadRequest` message bodies
//! - `Watermark`, the single "last sync" marker exchanged with the server
//! - JSON encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Wire format
//!
//! ```text
//! GET  {base}/items   X-Last-Sync-Timestamp: <epoch ms>
//!   -> { "items": [RemoteItem], "lastSyncTimestamp": <epoch ms> }
//! POST {base}/items   { "items": [RemoteItem], "lastSyncTimestamp": <epoch ms> }
//! ```
//!
//! Timestamps are integer epoch milliseconds so that both sides compare them
//! the same way.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod item;
mod messages;
mod watermark;

pub use error::{ProtocolError, ProtocolResult};
pub use item::RemoteItem;
pub use messages::{SyncResponse, UploadRequest, ITEMS_PATH, WATERMARK_HEADER};
pub use watermark::Watermark;
