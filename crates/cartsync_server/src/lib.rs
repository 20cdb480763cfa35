//! # CartSync Server
//!
//! Reference sync server for CartSync shopping lists.
//!
//! This crate provides:
//! - The `GET /items` and `POST /items` endpoints of the sync protocol
//! - An item ledger that keeps the latest copy of every item
//! - Last-write-wins resolution of concurrent uploads
//!
//! # Architecture
//!
//! The server is transport-agnostic: [`SyncServer::handle_http`] takes the
//! method, path, watermark header and body of a request and returns a status
//! and JSON body, so it can sit behind any HTTP front end or be called
//! in-process by tests.
//!
//! # Protocol
//!
//! 1. Client fetches items received since its watermark
//! 2. Client uploads its full item set; the server keeps the later
//!    `updatedAt` per id
//! 3. Client advances its watermark to the `lastSyncTimestamp` it was given

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod ledger;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, UploadSummary};
pub use ledger::{ItemLedger, LedgerEntry};
pub use server::{HttpReply, SyncServer};
