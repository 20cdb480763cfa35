//! Sync command implementation.

use crate::file_store::FileItemStore;
use crate::http_client::ReqwestClient;
use cartsync_engine::{HttpTransport, RetryConfig, SyncConfig, SyncEngine, SyncOutcome};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Connection options from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    /// Base URL of the sync server.
    pub server_url: String,
    /// Retries after a failed request.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Options {
    fn sync_config(&self) -> SyncConfig {
        let retry = RetryConfig::new(self.max_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms));
        SyncConfig::new(self.server_url.clone())
            .with_retry(retry)
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Runs the sync command.
///
/// Runs one cycle and persists the new watermark once it completes. Ctrl-C
/// abandons any pending retry; local changes made by the merge are kept.
pub async fn run(data: &Path, options: Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.sync_config();
    let store = Arc::new(FileItemStore::open(data)?);
    let watermark = store.watermark();
    let transport = HttpTransport::new(config.server_url.clone(), ReqwestClient::new(&config)?);
    let engine = Arc::new(
        SyncEngine::new(config, transport, Arc::clone(&store)).with_watermark(watermark),
    );

    let interrupt = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling sync");
                engine.shutdown();
            }
        })
    };

    let outcome = engine.sync_now().await;
    interrupt.abort();

    match outcome? {
        SyncOutcome::Completed(result) => {
            store.set_watermark(result.watermark)?;
            info!(path = %store.path().display(), "watermark saved");
            println!(
                "Synced: {} fetched, {} new, {} updated, {} uploaded ({} ms)",
                result.fetched,
                result.created,
                result.adopted,
                result.uploaded,
                result.duration.as_millis()
            );
        }
        SyncOutcome::Skipped => println!("A sync is already running."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_onto_sync_config() {
        let options = Options {
            server_url: "https://lists.example.com".into(),
            max_retries: 5,
            base_delay_ms: 250,
            timeout_secs: 12,
        };
        let config = options.sync_config();

        assert_eq!(config.server_url, "https://lists.example.com");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(config.sync_interval, None);
    }
}
