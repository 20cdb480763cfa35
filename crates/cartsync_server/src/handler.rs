//! Request handlers for sync endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::ledger::ItemLedger;
use cartsync_protocol::{SyncResponse, UploadRequest, Watermark};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Item ledger (shared across all handlers).
    pub ledger: Arc<ItemLedger>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, ledger: Arc<ItemLedger>) -> Self {
        Self { config, ledger }
    }
}

/// What an upload changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Copies that replaced or created a ledger entry.
    pub accepted: usize,
    /// Copies that were not newer than the stored one.
    pub ignored: usize,
}

/// Handler for sync requests.
///
/// Takes the current time as a parameter so behaviour is reproducible in
/// tests; [`SyncServer`](crate::SyncServer) supplies the wall clock.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a fetch: items received since `watermark`.
    pub fn handle_fetch(&self, watermark: Watermark, now: DateTime<Utc>) -> SyncResponse {
        let (items, checkpoint) = self.context.ledger.changed_since(watermark, now);
        debug!(%watermark, returned = items.len(), %checkpoint, "fetch handled");
        SyncResponse::new(items, checkpoint)
    }

    /// Handles an upload.
    ///
    /// The whole batch is rejected if it is too large or, with validation
    /// enabled, if any item has a blank id or name or a zero quantity.
    pub fn handle_upload(
        &self,
        request: UploadRequest,
        now: DateTime<Utc>,
    ) -> ServerResult<UploadSummary> {
        let config = &self.context.config;
        let count = request.items.len();

        if count > config.max_upload_batch {
            return Err(ServerError::BatchTooLarge {
                count,
                max: config.max_upload_batch,
            });
        }

        if config.validate_items {
            if let Some(bad) = request
                .items
                .iter()
                .find(|item| item.id.trim().is_empty() || !item.has_valid_content())
            {
                return Err(ServerError::InvalidRequest(format!(
                    "item {:?} has an empty id or name, or a zero quantity",
                    bad.id
                )));
            }
        }

        let accepted = self.context.ledger.upsert(request.items, now);
        let summary = UploadSummary {
            accepted,
            ignored: count - accepted,
        };
        info!(
            accepted = summary.accepted,
            ignored = summary.ignored,
            client_watermark = %request.last_sync_timestamp,
            "upload handled"
        );
        Ok(summary)
    }
}
