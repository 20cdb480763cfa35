//! Configuration for the sync engine.

use rand::Rng;
use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server base URL.
    pub server_url: String,
    /// Retry configuration for fetch and upload.
    pub retry: RetryConfig,
    /// Per-request timeout, applied by the HTTP client.
    pub request_timeout: Duration,
    /// Connection establishment timeout, applied by the HTTP client.
    pub connect_timeout: Duration,
    /// Interval for scheduled sync; `None` disables the scheduler.
    pub sync_interval: Option<Duration>,
    /// Whether [`SyncEngine::start`](crate::SyncEngine::start) runs an
    /// initial cycle.
    pub sync_on_start: bool,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            sync_interval: None,
            sync_on_start: true,
        }
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the interval for scheduled sync.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Enables or disables the initial sync on start.
    pub fn with_sync_on_start(mut self, enabled: bool) -> Self {
        self.sync_on_start = enabled;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later retry.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to each delay.
    pub max_jitter: Duration,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(100),
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum jitter.
    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Total attempts a call may make, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry `retry` (1-indexed), without jitter.
    ///
    /// `base_delay * 2^(retry - 1)`; retry 0 is the first attempt and has
    /// no delay.
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX)
    }

    /// Calculates the delay before retry `retry` (1-indexed), jitter included.
    ///
    /// The result lies in `[backoff, backoff + max_jitter)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let backoff = self.backoff_for_retry(retry);
        if retry == 0 || self.max_jitter.is_zero() {
            return backoff;
        }
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..self.max_jitter);
        backoff.saturating_add(jitter)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
