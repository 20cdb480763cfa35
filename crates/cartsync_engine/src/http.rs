//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait so that any HTTP
//! library (reqwest, hyper, ...) or an in-process loopback can carry the
//! requests.

use crate::error::{TransportError, TransportResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use cartsync_protocol::{
    RemoteItem, SyncResponse, UploadRequest, Watermark, ITEMS_PATH, WATERMARK_HEADER,
};
use serde::Deserialize;

/// HTTP method used by the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`, used by fetch.
    Get,
    /// `POST`, used by upload.
    Post,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the path component of the URL.
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        without_scheme
            .find('/')
            .map(|index| &without_scheme[index..])
            .unwrap_or("/")
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }
}

/// HTTP client abstraction.
///
/// Implementations report failures to complete the exchange as
/// [`TransportError::Connectivity`]; any response that arrives, whatever its
/// status, is returned as `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

/// HTTP-based sync transport.
///
/// Uses JSON bodies and carries the watermark in the
/// `X-Last-Sync-Timestamp` header on fetch.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync server (e.g., "https://lists.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn items_url(&self) -> String {
        format!("{}{}", self.base_url, ITEMS_PATH)
    }
}

#[async_trait]
impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn fetch(&self, watermark: Watermark) -> TransportResult<SyncResponse> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: self.items_url(),
            headers: vec![
                ("Accept".into(), "application/json".into()),
                (WATERMARK_HEADER.into(), watermark.to_header_value()),
            ],
            body: None,
        };

        let response = self.client.send(request).await?;
        check_status(&response)?;

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Err(TransportError::InvalidResponse(
                "fetch response has no body".into(),
            ));
        }

        Ok(SyncResponse::decode(&response.body)?)
    }

    async fn upload(&self, items: &[RemoteItem], watermark: Watermark) -> TransportResult<()> {
        let body = UploadRequest::new(items.to_vec(), watermark).encode()?;
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.items_url(),
            headers: vec![
                ("Accept".into(), "application/json".into()),
                ("Content-Type".into(), "application/json".into()),
            ],
            body: Some(body),
        };

        let response = self.client.send(request).await?;
        check_status(&response)
    }
}

/// Maps a status code onto the transport error taxonomy.
fn check_status(response: &HttpResponse) -> TransportResult<()> {
    match response.status {
        200..=299 => Ok(()),
        100..=599 => Err(TransportError::server(
            response.status,
            error_message(&response.body),
        )),
        other => Err(TransportError::InvalidResponse(format!(
            "unexpected status code {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Extracts a short message from an error body.
fn error_message(body: &[u8]) -> String {
    if let Ok(payload) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }
    String::from_utf8_lossy(body).trim().chars().take(180).collect()
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a request and returns the response.
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

/// A loopback HTTP client that routes requests directly to a sync server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

#[async_trait]
impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        Ok(self.server.handle(&request))
    }
}
