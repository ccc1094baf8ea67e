//! Sync engine: drains the pending-sale queue against the remote endpoint.
//!
//! One pass walks the queue in insertion order, one request per record,
//! sequentially. A success removes the record; a failure bumps its retry
//! counter, stamps the earliest next-attempt time from the backoff
//! schedule, and the pass moves on — a bad record never blocks the rest.
//! At most one pass runs at a time; a pass requested while one is in
//! flight is a no-op. Records inside their backoff window or out of retry
//! budget are skipped (the latter stay queued until an explicit purge).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::endpoint::SaleEndpoint;
use crate::network::NetworkMonitor;
use crate::queue::QueueStore;
use uuid::Uuid;

/// Shared sync-side state, read by the status reporter.
pub struct SyncState {
    syncing: AtomicBool,
    synced_total: AtomicU64,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            syncing: AtomicBool::new(false),
            synced_total: AtomicU64::new(0),
            last_sync: Mutex::new(None),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Sales confirmed by the endpoint since process start.
    pub fn synced_total(&self) -> u64 {
        self.synced_total.load(Ordering::SeqCst)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self
            .last_sync
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_pass(&self, submitted: usize) {
        if submitted > 0 {
            self.synced_total
                .fetch_add(submitted as u64, Ordering::SeqCst);
        }
        let mut guard = self
            .last_sync
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Utc::now());
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry budget and backoff schedule for failed submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Submission attempts per record before the engine stops trying.
    /// `None` retries forever; the default caps it.
    pub max_attempts: Option<u32>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            base_delay_ms: 5_000,
            max_delay_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    /// True when a record with this many failed attempts is out of budget.
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        match self.max_attempts {
            Some(max) => retry_count >= max,
            None => false,
        }
    }

    /// Backoff delay before the next attempt: exponential on the retry
    /// count, clamped, plus jitter seeded from the sale id so a fleet of
    /// terminals retrying the same attempt number does not stampede the
    /// dashboard in lockstep.
    pub fn delay_for(&self, retry_count: u32, id: Uuid) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << retry_count.min(16));
        let bounded = exp.clamp(1_000, self.max_delay_ms.max(1_000));
        Duration::from_millis(bounded + deterministic_jitter_ms(id.as_u128() as u64))
    }
}

fn deterministic_jitter_ms(seed: u64) -> u64 {
    (seed.wrapping_mul(2654435761) % 700) + 50
}

/// Result of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was already in flight; the queue was not touched.
    AlreadyRunning,
    Completed {
        /// Sales confirmed and removed this pass.
        submitted: usize,
        /// Unsynced records still queued after the pass.
        remaining: usize,
        /// Records skipped because their retry budget is spent.
        exhausted: usize,
    },
}

/// Drains the queue store through a [`SaleEndpoint`]. Holds no copy of the
/// collection — every read and write goes through the store.
pub struct SyncEngine<E> {
    store: Arc<QueueStore>,
    endpoint: E,
    policy: RetryPolicy,
    state: Arc<SyncState>,
}

impl<E: SaleEndpoint + Send + Sync> SyncEngine<E> {
    pub fn new(
        store: Arc<QueueStore>,
        endpoint: E,
        policy: RetryPolicy,
        state: Arc<SyncState>,
    ) -> Self {
        Self {
            store,
            endpoint,
            policy,
            state,
        }
    }

    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    /// Run one sync pass. Also the manual-sync entry point: the UI calls
    /// this directly when the operator hits "sync now".
    pub async fn sync_pass(&self) -> PassOutcome {
        if self
            .state
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync pass requested while one is in flight; skipping");
            return PassOutcome::AlreadyRunning;
        }

        let outcome = self.run_pass().await;
        if let PassOutcome::Completed { submitted, .. } = outcome {
            self.state.record_pass(submitted);
        }
        self.state.syncing.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_pass(&self) -> PassOutcome {
        let pending = self.store.list_pending();
        if pending.is_empty() {
            return PassOutcome::Completed {
                submitted: 0,
                remaining: 0,
                exhausted: 0,
            };
        }

        debug!(pending = pending.len(), "sync pass started");
        let started_at = Utc::now();
        let mut submitted = 0usize;
        let mut exhausted = 0usize;

        // Insertion order, one request per record, awaited sequentially.
        for sale in &pending {
            if self.policy.is_exhausted(sale.retry_count) {
                exhausted += 1;
                continue;
            }
            // A previous failure stamped the record; leave it alone until
            // its backoff window has elapsed.
            if let Some(due_at) = sale.next_retry_at {
                if due_at > started_at {
                    debug!(sale_id = %sale.id, due_at = %due_at, "backoff window open; deferring");
                    continue;
                }
            }

            match self.endpoint.submit(sale).await {
                Ok(()) => {
                    self.store.remove(sale.id);
                    submitted += 1;
                    debug!(sale_id = %sale.id, "sale synced");
                }
                Err(e) => {
                    let delay = self.policy.delay_for(sale.retry_count, sale.id);
                    let due_at =
                        Utc::now() + ChronoDuration::milliseconds(delay.as_millis() as i64);
                    let retries = self.store.record_failure(sale.id, due_at).unwrap_or(0);
                    warn!(
                        sale_id = %sale.id,
                        retries,
                        due_at = %due_at,
                        error = %e,
                        "sale submission failed; kept queued"
                    );
                }
            }
        }

        let remaining = self.store.pending_count();
        if exhausted > 0 {
            warn!(
                exhausted,
                "sales out of retry budget; waiting for manual purge"
            );
        }
        info!(submitted, remaining, "sync pass complete");
        PassOutcome::Completed {
            submitted,
            remaining,
            exhausted,
        }
    }
}

/// Start the background sync loop: a pass per interval tick, plus an
/// immediate pass whenever the trigger channel fires (reconnect or manual
/// sync). The loop stops when `running` clears or the trigger channel
/// closes. While offline the queue is left alone — "try again later".
pub fn spawn_sync_loop<E>(
    engine: Arc<SyncEngine<E>>,
    monitor: Arc<NetworkMonitor>,
    interval: Duration,
    mut trigger: mpsc::Receiver<()>,
    running: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()>
where
    E: SaleEndpoint + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "sync loop started");
        let mut was_online: Option<bool> = None;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                received = trigger.recv() => {
                    if received.is_none() {
                        break;
                    }
                }
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }

            let online = monitor.is_online();
            if !online {
                if was_online != Some(false) {
                    info!("network offline; deferring sync and keeping queue pending");
                }
                was_online = Some(false);
                continue;
            }
            if was_online == Some(false) {
                info!("network restored; resuming queued sync");
            }
            was_online = Some(true);

            match engine.sync_pass().await {
                PassOutcome::AlreadyRunning => {}
                PassOutcome::Completed {
                    submitted,
                    remaining,
                    ..
                } => {
                    if submitted > 0 {
                        info!(submitted, remaining, "sync cycle complete");
                    }
                }
            }
        }
        info!("sync loop stopped");
    })
}
