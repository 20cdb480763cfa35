//! Transport layer abstraction for sync operations.

use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use cartsync_protocol::{RemoteItem, SyncResponse, Watermark};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A sync transport handles network communication with the sync server.
///
/// Each call is a single attempt; retries are layered on top by
/// [`RetryingTransport`](crate::RetryingTransport).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Fetches items the server changed since `watermark`.
    async fn fetch(&self, watermark: Watermark) -> TransportResult<SyncResponse>;

    /// Uploads the full local item set.
    async fn upload(&self, items: &[RemoteItem], watermark: Watermark) -> TransportResult<()>;
}

#[async_trait]
impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    async fn fetch(&self, watermark: Watermark) -> TransportResult<SyncResponse> {
        (**self).fetch(watermark).await
    }

    async fn upload(&self, items: &[RemoteItem], watermark: Watermark) -> TransportResult<()> {
        (**self).upload(items, watermark).await
    }
}

/// A scripted transport for testing.
///
/// Queued results are consumed one per call; once the queue is empty the
/// fallback applies (the fetch response set with
/// [`set_fetch_response`](MockTransport::set_fetch_response), and success for
/// uploads).
#[derive(Debug, Default)]
pub struct MockTransport {
    fetch_queue: Mutex<VecDeque<TransportResult<SyncResponse>>>,
    fetch_fallback: Mutex<Option<SyncResponse>>,
    upload_queue: Mutex<VecDeque<TransportResult<()>>>,
    fetch_delay: Mutex<Option<Duration>>,
    fetch_calls: AtomicUsize,
    fetch_watermarks: Mutex<Vec<Watermark>>,
    uploads: Mutex<Vec<(Vec<RemoteItem>, Watermark)>>,
    upload_calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response returned by every fetch once the queue is drained.
    pub fn set_fetch_response(&self, response: SyncResponse) {
        *self.fetch_fallback.lock() = Some(response);
    }

    /// Queues a one-shot fetch result.
    pub fn push_fetch_result(&self, result: TransportResult<SyncResponse>) {
        self.fetch_queue.lock().push_back(result);
    }

    /// Queues `count` copies of a fetch failure.
    pub fn fail_fetch(&self, count: usize, error: TransportError) {
        let mut queue = self.fetch_queue.lock();
        for _ in 0..count {
            queue.push_back(Err(error.clone()));
        }
    }

    /// Queues a one-shot upload result.
    pub fn push_upload_result(&self, result: TransportResult<()>) {
        self.upload_queue.lock().push_back(result);
    }

    /// Queues `count` copies of an upload failure.
    pub fn fail_upload(&self, count: usize, error: TransportError) {
        let mut queue = self.upload_queue.lock();
        for _ in 0..count {
            queue.push_back(Err(error.clone()));
        }
    }

    /// Makes every fetch suspend for `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    /// Number of fetch attempts made.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of upload attempts made.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Watermarks passed to fetch, in call order.
    pub fn fetch_watermarks(&self) -> Vec<Watermark> {
        self.fetch_watermarks.lock().clone()
    }

    /// Successful uploads, in call order.
    pub fn uploads(&self) -> Vec<(Vec<RemoteItem>, Watermark)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn fetch(&self, watermark: Watermark) -> TransportResult<SyncResponse> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_watermarks.lock().push(watermark);

        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.fetch_queue.lock().pop_front();
        match queued {
            Some(result) => result,
            None => self.fetch_fallback.lock().clone().ok_or_else(|| {
                TransportError::InvalidResponse("no mock fetch response set".into())
            }),
        }
    }

    async fn upload(&self, items: &[RemoteItem], watermark: Watermark) -> TransportResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.upload_queue.lock().pop_front();
        queued.unwrap_or(Ok(()))?;
        self.uploads.lock().push((items.to_vec(), watermark));
        Ok(())
    }
}
