//! Read-side status aggregation for the UI layer.
//!
//! Holds no state of its own: every report is recomputed from the queue
//! store, the network monitor, and the shared sync state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::SyncState;
use crate::network::NetworkMonitor;
use crate::queue::QueueStore;

/// Snapshot handed to the UI. Serializes in camelCase to match the rest of
/// the dashboard wire surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub pending_items: usize,
    pub has_pending: bool,
    pub is_online: bool,
    pub sync_in_progress: bool,
    pub synced_total: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
}

pub struct StatusReporter {
    store: Arc<QueueStore>,
    monitor: Arc<NetworkMonitor>,
    state: Arc<SyncState>,
}

impl StatusReporter {
    pub fn new(
        store: Arc<QueueStore>,
        monitor: Arc<NetworkMonitor>,
        state: Arc<SyncState>,
    ) -> Self {
        Self {
            store,
            monitor,
            state,
        }
    }

    pub fn report(&self) -> SyncStatus {
        let pending_items = self.store.pending_count();
        SyncStatus {
            pending_items,
            has_pending: pending_items > 0,
            is_online: self.monitor.is_online(),
            sync_in_progress: self.state.is_syncing(),
            synced_total: self.state.synced_total(),
            last_sync_at: self.state.last_sync(),
        }
    }
}
