//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler, UploadSummary};
use crate::ledger::ItemLedger;
use cartsync_protocol::{SyncResponse, UploadRequest, Watermark, ITEMS_PATH};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Status and JSON body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// Status code.
    pub status: u16,
    /// JSON body.
    pub body: Vec<u8>,
}

impl HttpReply {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    fn error(err: &ServerError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        Self {
            status: err.status_code(),
            body: body.into_bytes(),
        }
    }
}

/// The sync server.
///
/// This server answers the two CartSync endpoints against an in-memory
/// [`ItemLedger`].
///
/// # Example
///
/// ```
/// use cartsync_server::{SyncServer, ServerConfig};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let reply = server.handle_http("GET", "/items", Some("0"), b"");
/// assert_eq!(reply.status, 200);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_ledger(config, Arc::new(ItemLedger::new()))
    }

    /// Creates a sync server with an existing ledger.
    pub fn with_ledger(config: ServerConfig, ledger: Arc<ItemLedger>) -> Self {
        let context = Arc::new(HandlerContext::new(config, ledger));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles a fetch request.
    pub fn handle_fetch(&self, watermark: Watermark) -> SyncResponse {
        self.handler.handle_fetch(watermark, Utc::now())
    }

    /// Handles an upload request.
    pub fn handle_upload(&self, request: UploadRequest) -> ServerResult<UploadSummary> {
        self.handler.handle_upload(request, Utc::now())
    }

    /// Routes an HTTP request to the matching endpoint.
    ///
    /// `watermark` is the value of the `X-Last-Sync-Timestamp` header; a
    /// missing header fetches everything.
    pub fn handle_http(
        &self,
        method: &str,
        path: &str,
        watermark: Option<&str>,
        body: &[u8],
    ) -> HttpReply {
        let path = path.split('?').next().unwrap_or(path);
        let result = match (method.to_ascii_uppercase().as_str(), path) {
            ("GET", ITEMS_PATH) => self.http_fetch(watermark),
            ("POST", ITEMS_PATH) => self.http_upload(body),
            (_, ITEMS_PATH) => Err(ServerError::MethodNotAllowed(method.to_string())),
            _ => Err(ServerError::NotFound(path.to_string())),
        };

        match result {
            Ok(body) => HttpReply::ok(body),
            Err(err) => {
                warn!(method, path, error = %err, "request rejected");
                HttpReply::error(&err)
            }
        }
    }

    fn http_fetch(&self, watermark: Option<&str>) -> ServerResult<Vec<u8>> {
        let watermark = match watermark {
            Some(value) => Watermark::parse_header_value(value)?,
            None => Watermark::BEGINNING,
        };
        self.handle_fetch(watermark)
            .encode()
            .map_err(|err| ServerError::Internal(err.to_string()))
    }

    fn http_upload(&self, body: &[u8]) -> ServerResult<Vec<u8>> {
        let request = UploadRequest::decode(body)?;
        let summary = self.handle_upload(request)?;
        serde_json::to_vec(&summary).map_err(|err| ServerError::Internal(err.to_string()))
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the ledger.
    pub fn ledger(&self) -> &Arc<ItemLedger> {
        &self.context.ledger
    }

    /// Returns the number of items in the ledger.
    pub fn item_count(&self) -> usize {
        self.context.ledger.len()
    }
}

impl Default for SyncServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartsync_protocol::RemoteItem;
    use chrono::{DateTime, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn item(id: &str, updated_ms: i64) -> RemoteItem {
        RemoteItem {
            id: id.into(),
            name: format!("item {id}"),
            quantity: 1,
            note: None,
            is_bought: false,
            created_at: at(0),
            updated_at: at(updated_ms),
        }
    }

    fn upload_body(items: Vec<RemoteItem>) -> Vec<u8> {
        UploadRequest::new(items, Watermark::BEGINNING).encode().unwrap()
    }

    #[test]
    fn server_lifecycle() {
        let server = SyncServer::default();
        assert_eq!(server.item_count(), 0);
        assert_eq!(server.config().max_upload_batch, 1000);
    }

    #[test]
    fn full_sync_flow_over_http() {
        let server = SyncServer::default();

        let reply = server.handle_http("GET", "/items", None, b"");
        assert_eq!(reply.status, 200);
        let first = SyncResponse::decode(&reply.body).unwrap();
        assert!(first.items.is_empty());

        let reply = server.handle_http("POST", "/items", None, &upload_body(vec![item("a", 5)]));
        assert_eq!(reply.status, 200);
        let summary: UploadSummary = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(summary.accepted, 1);

        let header = first.last_sync_timestamp.to_header_value();
        let reply = server.handle_http("get", "/items", Some(&header), b"");
        let second = SyncResponse::decode(&reply.body).unwrap();
        assert_eq!(second.items, vec![item("a", 5)]);
        assert!(second.last_sync_timestamp > first.last_sync_timestamp);
    }

    #[test]
    fn bad_watermark_header_is_400() {
        let server = SyncServer::default();
        let reply = server.handle_http("GET", "/items", Some("yesterday"), b"");
        assert_eq!(reply.status, 400);
        let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("invalid request"));
    }

    #[test]
    fn malformed_upload_is_400() {
        let server = SyncServer::default();
        let reply = server.handle_http("POST", "/items", None, b"{not json");
        assert_eq!(reply.status, 400);
        assert_eq!(server.item_count(), 0);
    }

    #[test]
    fn oversized_upload_is_413() {
        let server = SyncServer::new(ServerConfig::new().with_max_upload_batch(1));
        let reply = server.handle_http(
            "POST",
            "/items",
            None,
            &upload_body(vec![item("a", 1), item("b", 1)]),
        );
        assert_eq!(reply.status, 413);
    }

    #[test]
    fn routing_errors() {
        let server = SyncServer::default();
        assert_eq!(server.handle_http("GET", "/lists", None, b"").status, 404);
        assert_eq!(server.handle_http("DELETE", "/items", None, b"").status, 405);
        assert_eq!(server.handle_http("GET", "/items?x=1", None, b"").status, 200);
    }

    #[test]
    fn shared_ledger() {
        let ledger = Arc::new(ItemLedger::new());
        let server = SyncServer::with_ledger(ServerConfig::default(), Arc::clone(&ledger));

        server
            .handle_upload(UploadRequest::new(vec![item("a", 1)], Watermark::BEGINNING))
            .unwrap();

        assert_eq!(ledger.len(), 1);
        assert!(Arc::ptr_eq(server.ledger(), &ledger));
    }
}
