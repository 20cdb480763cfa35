//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::item::Item;
use crate::reconcile::{apply, merge};
use crate::retry::{RetryingTransport, Shutdown};
use crate::store::ItemStore;
use crate::transport::SyncTransport;
use cartsync_protocol::{RemoteItem, Watermark};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No cycle is running.
    #[default]
    Idle,
    /// A cycle is in flight.
    Syncing,
}

/// Cumulative statistics across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Cycles that finished successfully.
    pub cycles_completed: u64,
    /// Cycles that ended with an error.
    pub cycles_failed: u64,
    /// Local items created from remote ones.
    pub items_created: u64,
    /// Local items overwritten by newer remote copies.
    pub items_adopted: u64,
    /// Items sent to the server across all successful uploads.
    pub items_uploaded: u64,
    /// Wall-clock time of the last successful cycle.
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Result of a successful sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCycleResult {
    /// Remote items received by fetch.
    pub fetched: usize,
    /// Local items created from remote ones.
    pub created: usize,
    /// Local items overwritten by newer remote copies.
    pub adopted: usize,
    /// Items sent by upload.
    pub uploaded: usize,
    /// The watermark the cycle advanced to.
    pub watermark: Watermark,
    /// Duration of the cycle.
    pub duration: Duration,
}

/// What a sync request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A cycle ran to completion.
    Completed(SyncCycleResult),
    /// Another cycle was already running; the request was dropped.
    Skipped,
}

impl SyncOutcome {
    /// Returns the cycle result, if a cycle ran.
    pub fn result(&self) -> Option<&SyncCycleResult> {
        match self {
            SyncOutcome::Completed(result) => Some(result),
            SyncOutcome::Skipped => None,
        }
    }
}

/// Observable snapshot of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Current state.
    pub state: SyncState,
    /// Message of the last failed cycle, kept until the next cycle starts
    /// or [`SyncEngine::clear_error`] is called.
    pub last_error: Option<String>,
    /// Last successful watermark.
    pub watermark: Watermark,
    /// Result of the last successful cycle.
    pub last_result: Option<SyncCycleResult>,
    /// Cumulative statistics.
    pub stats: SyncStats,
}

impl SyncStatus {
    /// Returns true while a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        self.state == SyncState::Syncing
    }

    /// Returns true if the last cycle failed and the error is still retained.
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            last_error: None,
            watermark: Watermark::BEGINNING,
            last_result: None,
            stats: SyncStats::default(),
        }
    }
}

/// The sync engine manages synchronization with a remote server.
///
/// Each cycle fetches remote changes since the watermark, merges them into
/// the local store, uploads the full local item set and then advances the
/// watermark. Initial, manual and scheduled syncs all go through
/// [`sync_now`](SyncEngine::sync_now); a request made while a cycle is in
/// flight is dropped.
pub struct SyncEngine<T: SyncTransport, S: ItemStore + ?Sized> {
    config: SyncConfig,
    transport: RetryingTransport<T>,
    store: Arc<S>,
    syncing: AtomicBool,
    status: watch::Sender<SyncStatus>,
    shutdown: Shutdown,
}

impl<T: SyncTransport, S: ItemStore + ?Sized> SyncEngine<T, S> {
    /// Creates a new sync engine.
    ///
    /// `transport` makes single attempts; the engine wraps it with the retry
    /// policy from `config.retry`.
    pub fn new(config: SyncConfig, transport: T, store: Arc<S>) -> Self {
        let shutdown = Shutdown::new();
        let transport =
            RetryingTransport::with_shutdown(transport, config.retry.clone(), shutdown.clone());
        let (status, _) = watch::channel(SyncStatus::default());

        Self {
            config,
            transport,
            store,
            syncing: AtomicBool::new(false),
            status,
            shutdown,
        }
    }

    /// Seeds a previously persisted watermark.
    pub fn with_watermark(self, watermark: Watermark) -> Self {
        self.status.send_modify(|status| status.watermark = watermark);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the single-attempt transport.
    pub fn transport(&self) -> &T {
        self.transport.inner()
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns a snapshot of the current status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Returns true while a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Returns the retained error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }

    /// Returns the last successful watermark.
    pub fn watermark(&self) -> Watermark {
        self.status.borrow().watermark
    }

    /// Discards the retained error.
    pub fn clear_error(&self) {
        self.status
            .send_if_modified(|status| status.last_error.take().is_some());
    }

    /// Stops the scheduler and abandons any pending retry.
    ///
    /// Irreversible: later sync requests fail with a cancellation error.
    pub fn shutdown(&self) {
        info!("sync engine shutting down");
        self.shutdown.trigger();
    }

    /// Returns true once [`shutdown`](SyncEngine::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Runs one sync cycle now.
    ///
    /// Returns [`SyncOutcome::Skipped`] without touching the transport if a
    /// cycle is already running. On failure the error is retained in the
    /// status and the watermark is left where it was; local changes made by
    /// the merge step are kept.
    pub async fn sync_now(&self) -> SyncResult<SyncOutcome> {
        let Some(_guard) = CycleGuard::acquire(&self.syncing, &self.status) else {
            debug!("sync already in progress, request dropped");
            return Ok(SyncOutcome::Skipped);
        };

        let watermark = self.status.borrow().watermark;
        self.status.send_modify(|status| {
            status.state = SyncState::Syncing;
            status.last_error = None;
        });
        info!(%watermark, "sync cycle started");

        match self.run_cycle(watermark).await {
            Ok(result) => {
                info!(
                    fetched = result.fetched,
                    created = result.created,
                    adopted = result.adopted,
                    uploaded = result.uploaded,
                    watermark = %result.watermark,
                    duration_ms = result.duration.as_millis() as u64,
                    "sync cycle completed"
                );
                self.status.send_modify(|status| {
                    status.watermark = result.watermark;
                    status.stats.cycles_completed += 1;
                    status.stats.items_created += result.created as u64;
                    status.stats.items_adopted += result.adopted as u64;
                    status.stats.items_uploaded += result.uploaded as u64;
                    status.stats.last_sync_time = Some(Utc::now());
                    status.last_result = Some(result.clone());
                });
                Ok(SyncOutcome::Completed(result))
            }
            Err(err) => {
                if err.is_cancelled() {
                    info!("sync cycle cancelled");
                } else {
                    error!(error = %err, "sync cycle failed");
                }
                self.status.send_modify(|status| {
                    status.last_error = Some(err.to_string());
                    status.stats.cycles_failed += 1;
                });
                Err(err)
            }
        }
    }

    async fn run_cycle(&self, watermark: Watermark) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();

        let response = self.transport.fetch(watermark).await?;

        let local_items = self.store.fetch_all()?;
        let actions = merge(&response.items, &local_items);
        let summary = apply(self.store.as_ref(), &actions)?;

        let outgoing: Vec<RemoteItem> = self
            .store
            .fetch_all()?
            .iter()
            .map(Item::to_remote)
            .collect();
        self.transport.upload(&outgoing, watermark).await?;

        Ok(SyncCycleResult {
            fetched: response.items.len(),
            created: summary.created,
            adopted: summary.adopted,
            uploaded: outgoing.len(),
            watermark: response.last_sync_timestamp,
            duration: start.elapsed(),
        })
    }
}

impl<T, S> SyncEngine<T, S>
where
    T: SyncTransport + 'static,
    S: ItemStore + ?Sized + 'static,
{
    /// Runs the initial sync (if enabled) and starts the scheduler (if an
    /// interval is configured).
    ///
    /// A failed initial sync is retained in the status like any other.
    pub async fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.sync_on_start {
            if let Err(err) = self.sync_now().await {
                debug!(error = %err, "initial sync failed");
            }
        }
        self.spawn_periodic()
    }

    /// Spawns a task that runs a cycle every `sync_interval` until shutdown.
    ///
    /// Returns `None` when no interval is configured. The task holds a weak
    /// reference and also stops once the engine is dropped.
    pub fn spawn_periodic(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.sync_interval?;
        let engine = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "periodic sync started");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => {
                        let Some(engine) = engine.upgrade() else { break };
                        if let Err(err) = engine.sync_now().await {
                            debug!(error = %err, "scheduled sync failed");
                        }
                    }
                }
            }

            info!("periodic sync stopped");
        }))
    }
}

/// Holds the single-cycle flag for the duration of a cycle.
///
/// Released on drop, so a cycle future that is dropped mid-flight still
/// returns the engine to `Idle`.
struct CycleGuard<'a> {
    syncing: &'a AtomicBool,
    status: &'a watch::Sender<SyncStatus>,
}

impl<'a> CycleGuard<'a> {
    fn acquire(syncing: &'a AtomicBool, status: &'a watch::Sender<SyncStatus>) -> Option<Self> {
        syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { syncing, status })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.status.send_if_modified(|status| {
            let was_syncing = status.is_syncing();
            status.state = SyncState::Idle;
            was_syncing
        });
        // Status first: a cycle may start as soon as the flag is released.
        self.syncing.store(false, Ordering::Release);
    }
}
