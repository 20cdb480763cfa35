//! Retry with exponential backoff for transport calls.

use crate::config::RetryConfig;
use crate::error::{TransportError, TransportResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use cartsync_protocol::{RemoteItem, SyncResponse, Watermark};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// A shutdown signal shared between the engine and its pending retries.
///
/// Cloning yields another handle to the same signal. Once triggered it stays
/// triggered.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers the signal, waking every waiter.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once the signal has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes when the signal is triggered.
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            let triggered = *receiver.borrow_and_update();
            if triggered {
                return;
            }
            if receiver.changed().await.is_err() {
                // Sender gone: the signal can never fire.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Decorates a transport with bounded exponential backoff.
///
/// A failing call is retried up to `max_retries` times, waiting
/// `base_delay * 2^(k-1)` plus jitter before retry `k`. Every failure is
/// retried the same way, client errors included; when the retries run out
/// the last error is returned. Each wait races the shutdown signal, and a
/// triggered shutdown ends the call with [`TransportError::Cancelled`].
pub struct RetryingTransport<T: SyncTransport> {
    inner: T,
    config: RetryConfig,
    shutdown: Shutdown,
}

impl<T: SyncTransport> RetryingTransport<T> {
    /// Wraps `inner` with its own shutdown signal.
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self::with_shutdown(inner, config, Shutdown::new())
    }

    /// Wraps `inner`, abandoning pending retries when `shutdown` triggers.
    pub fn with_shutdown(inner: T, config: RetryConfig, shutdown: Shutdown) -> Self {
        Self {
            inner,
            config,
            shutdown,
        }
    }

    /// Returns the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Returns the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the shutdown signal.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    async fn with_retry<F, Fut, R>(&self, operation: &'static str, mut call: F) -> TransportResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportResult<R>>,
    {
        let mut retry = 0u32;

        loop {
            if self.shutdown.is_triggered() {
                return Err(TransportError::Cancelled);
            }

            let err = match call().await {
                Ok(value) => {
                    if retry > 0 {
                        info!(operation, retry, "transport call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if retry >= self.config.max_retries {
                error!(
                    operation,
                    attempts = retry + 1,
                    error = %err,
                    "transport call failed, retries exhausted"
                );
                return Err(err);
            }

            retry += 1;
            let delay = self.config.delay_for_retry(retry);
            warn!(
                operation,
                retry,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transport call failed, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.triggered() => {
                    info!(operation, "pending retry abandoned on shutdown");
                    return Err(TransportError::Cancelled);
                }
            }
        }
    }
}

#[async_trait]
impl<T: SyncTransport> SyncTransport for RetryingTransport<T> {
    async fn fetch(&self, watermark: Watermark) -> TransportResult<SyncResponse> {
        self.with_retry("fetch", || self.inner.fetch(watermark)).await
    }

    async fn upload(&self, items: &[RemoteItem], watermark: Watermark) -> TransportResult<()> {
        self.with_retry("upload", || self.inner.upload(items, watermark)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::time::Duration;
    use tokio::time::Instant;

    fn offline() -> TransportError {
        TransportError::Connectivity("network unreachable".into())
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries)
            .with_base_delay(Duration::from_millis(10))
            .with_max_jitter(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.set_fetch_response(SyncResponse::empty(Watermark::BEGINNING));
        let transport = RetryingTransport::new(Arc::clone(&mock), RetryConfig::default());

        transport.fetch(Watermark::BEGINNING).await.unwrap();
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let mock = Arc::new(MockTransport::new());
        mock.set_fetch_response(SyncResponse::empty(Watermark::from_millis(7).unwrap()));
        mock.fail_fetch(2, offline());
        let transport = RetryingTransport::new(Arc::clone(&mock), RetryConfig::default());

        let response = transport.fetch(Watermark::BEGINNING).await.unwrap();
        assert_eq!(response.last_sync_timestamp.as_millis(), 7);
        assert_eq!(mock.fetch_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries_plus_one() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_fetch(3, offline());
        mock.push_fetch_result(Err(TransportError::server(503, "last one")));
        mock.set_fetch_response(SyncResponse::empty(Watermark::BEGINNING));
        let transport = RetryingTransport::new(Arc::clone(&mock), fast_config(3));

        let err = transport.fetch(Watermark::BEGINNING).await.unwrap_err();
        assert_eq!(err, TransportError::server(503, "last one"));
        assert_eq!(mock.fetch_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_retried_too() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_upload(10, TransportError::server(400, "bad request"));
        let transport = RetryingTransport::new(Arc::clone(&mock), fast_config(2));

        let err = transport.upload(&[], Watermark::BEGINNING).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(mock.upload_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_follow_exponential_schedule() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_fetch(3, offline());
        mock.set_fetch_response(SyncResponse::empty(Watermark::BEGINNING));
        let transport = RetryingTransport::new(Arc::clone(&mock), RetryConfig::default());

        let start = Instant::now();
        transport.fetch(Watermark::BEGINNING).await.unwrap();
        let elapsed = start.elapsed();

        // 1s + 2s + 4s of backoff, plus under 100ms of jitter per retry.
        assert!(elapsed >= Duration::from_secs(7));
        assert!(elapsed < Duration::from_millis(7_300));
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_config_makes_one_attempt() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_fetch(5, offline());
        let transport = RetryingTransport::new(Arc::clone(&mock), RetryConfig::no_retry());

        assert!(transport.fetch(Watermark::BEGINNING).await.is_err());
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_pending_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_fetch(10, offline());
        let shutdown = Shutdown::new();
        let transport = Arc::new(RetryingTransport::with_shutdown(
            Arc::clone(&mock),
            RetryConfig::default().with_base_delay(Duration::from_secs(60)),
            shutdown.clone(),
        ));

        let task = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.fetch(Watermark::BEGINNING).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        let start = Instant::now();
        shutdown.trigger();

        let result = task.await.unwrap();
        assert_eq!(result, Err(TransportError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn triggered_shutdown_prevents_new_calls() {
        let mock = Arc::new(MockTransport::new());
        mock.set_fetch_response(SyncResponse::empty(Watermark::BEGINNING));
        let transport = RetryingTransport::new(Arc::clone(&mock), RetryConfig::default());
        transport.shutdown().trigger();

        let result = transport.fetch(Watermark::BEGINNING).await;
        assert_eq!(result, Err(TransportError::Cancelled));
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[test]
    fn shutdown_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        assert!(!clone.is_triggered());
        shutdown.trigger();
        assert!(clone.is_triggered());
    }
}
