//! reqwest-backed HTTP client for the sync transport.

use async_trait::async_trait;
use cartsync_engine::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, SyncConfig, TransportError,
    TransportResult,
};
use tracing::debug;

/// Sends sync requests over the network.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client with the request and connect timeouts from `config`.
    pub fn new(config: &SyncConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|error| {
                TransportError::Connectivity(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::Connectivity(format!("request failed: {error}")))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|error| {
            TransportError::Connectivity(format!("failed to read response body: {error}"))
        })?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
