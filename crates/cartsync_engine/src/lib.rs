//! # CartSync Engine
//!
//! Offline-first sync engine for CartSync shopping lists.
//!
//! This crate provides:
//! - Sync orchestrator (idle → syncing → idle, with a retained last error)
//! - Watermark management
//! - Last-write-wins reconciliation of remote and local items
//! - Retry with exponential backoff and jitter
//! - HTTP transport abstraction
//! - The local item store interface and an in-memory store
//!
//! ## Architecture
//!
//! The engine implements a **fetch-merge-upload** cycle:
//! 1. Fetch items the server changed since the watermark
//! 2. Merge them into the local store (later `updated_at` wins, local wins ties)
//! 3. Upload the full local item set
//! 4. Advance the watermark to the server's `lastSyncTimestamp`
//!
//! ## Key Invariants
//!
//! - At most one sync cycle runs at a time; overlapping requests are dropped
//! - The watermark only moves after fetch, merge and upload all succeed
//! - A failed cycle never rolls back local writes
//! - Merging the same remote batch twice changes nothing the second time
//! - Deletions are local only; they are never sent to the server

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod item;
mod reconcile;
mod retry;
mod state;
mod store;
mod transport;

pub use cartsync_protocol::{RemoteItem, SyncResponse, UploadRequest, Watermark};
pub use config::{RetryConfig, SyncConfig};
pub use error::{StoreError, StoreResult, SyncError, SyncResult, TransportError, TransportResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer};
pub use item::{Item, ItemId};
pub use reconcile::{apply, merge, MergeAction, MergeSummary};
pub use retry::{RetryingTransport, Shutdown};
pub use state::{SyncCycleResult, SyncEngine, SyncOutcome, SyncState, SyncStats, SyncStatus};
pub use store::{ItemStore, MemoryItemStore};
pub use transport::{MockTransport, SyncTransport};
