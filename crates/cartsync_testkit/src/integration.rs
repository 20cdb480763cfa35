//! Loopback harness wiring the sync engine to the reference server.

use cartsync_engine::{
    HttpRequest, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer, MemoryItemStore,
    RetryConfig, SyncConfig, SyncEngine,
};
use cartsync_protocol::WATERMARK_HEADER;
use cartsync_server::SyncServer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Base URL used by loopback engines.
pub const LOOPBACK_URL: &str = "http://loopback.test";

/// Serves engine requests from an in-process [`SyncServer`].
///
/// Can be switched offline, in which case every request is answered with
/// `503 Service Unavailable`.
pub struct ServerAdapter {
    server: Arc<SyncServer>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl ServerAdapter {
    /// Creates an adapter in front of `server`.
    pub fn new(server: Arc<SyncServer>) -> Self {
        Self {
            server,
            offline: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Makes every later request fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests received, offline ones included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Returns the server.
    pub fn server(&self) -> &Arc<SyncServer> {
        &self.server
    }
}

impl LoopbackServer for ServerAdapter {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            let body = serde_json::json!({ "error": "service unavailable" }).to_string();
            return HttpResponse::new(503, body.into_bytes());
        }

        let reply = self.server.handle_http(
            request.method.as_str(),
            request.path(),
            request.header(WATERMARK_HEADER),
            request.body.as_deref().unwrap_or_default(),
        );
        HttpResponse::new(reply.status, reply.body)
    }
}

/// Transport used by loopback engines.
pub type LoopbackTransport = HttpTransport<LoopbackClient<ServerAdapter>>;

/// Engine type produced by [`LoopbackHarness`].
pub type LoopbackEngine = SyncEngine<LoopbackTransport, MemoryItemStore>;

/// A client engine talking to a reference server over the loopback client.
pub struct LoopbackHarness {
    /// The engine under test.
    pub engine: Arc<LoopbackEngine>,
    /// The client's local store.
    pub store: Arc<MemoryItemStore>,
    /// The server the engine talks to.
    pub server: Arc<SyncServer>,
}

impl LoopbackHarness {
    /// A fresh server and an empty client without retries.
    pub fn new() -> Self {
        Self::with_server(Arc::new(SyncServer::default()), Arc::new(MemoryItemStore::new()))
    }

    /// A client with its own `store` against a shared `server`.
    pub fn with_server(server: Arc<SyncServer>, store: Arc<MemoryItemStore>) -> Self {
        let config = SyncConfig::new(LOOPBACK_URL).with_retry(RetryConfig::no_retry());
        Self::with_config(config, server, store)
    }

    /// A client with a custom configuration.
    pub fn with_config(
        config: SyncConfig,
        server: Arc<SyncServer>,
        store: Arc<MemoryItemStore>,
    ) -> Self {
        let adapter = ServerAdapter::new(Arc::clone(&server));
        let transport = HttpTransport::new(config.server_url.clone(), LoopbackClient::new(adapter));
        let engine = Arc::new(SyncEngine::new(config, transport, Arc::clone(&store)));

        Self {
            engine,
            store,
            server,
        }
    }

    /// The adapter in front of the server.
    pub fn adapter(&self) -> &ServerAdapter {
        self.engine.transport().client().server()
    }
}

impl Default for LoopbackHarness {
    fn default() -> Self {
        Self::new()
    }
}
