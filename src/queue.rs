//! Durable queue store for pending sales.
//!
//! The whole collection lives under a single storage key: one JSON file
//! holding a serialized array of [`PendingSale`] records. Every mutation
//! rewrites the file wholesale (temp file + rename, so a crash mid-write
//! never leaves a truncated queue behind). A missing or corrupt file is
//! treated as an empty queue — storage problems degrade, they never crash
//! the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::sale::{PendingSale, SaleDraft};

/// File-backed store owning the pending-sale collection. All reads and
/// writes from the sync engine go through these accessors; nothing else
/// touches the file.
pub struct QueueStore {
    path: PathBuf,
    records: Mutex<Vec<PendingSale>>,
}

impl QueueStore {
    /// Open the store at `path`, loading whatever is already persisted.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingSale>> {
        // A poisoned lock means a panic elsewhere; the queue data itself is
        // still consistent (mutations persist before returning).
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue a sale. Assigns the id and sync bookkeeping, persists, and
    /// returns the generated id.
    pub fn add(&self, draft: SaleDraft) -> Uuid {
        let sale = PendingSale::from_draft(draft);
        let id = sale.id;
        let mut records = self.lock();
        records.push(sale);
        self.persist(&records);
        debug!(sale_id = %id, queued = records.len(), "sale queued");
        id
    }

    /// Mark the matching record as synced. Returns `true` if a record
    /// transitioned; no-op when the id is unknown or already synced.
    pub fn mark_synced(&self, id: Uuid) -> bool {
        let mut records = self.lock();
        let changed = match records.iter_mut().find(|s| s.id == id && !s.synced) {
            Some(sale) => {
                sale.synced = true;
                true
            }
            None => false,
        };
        if changed {
            self.persist(&records);
        }
        changed
    }

    /// Delete the matching record. No-op when the id is unknown.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|s| s.id != id);
        let removed = records.len() != before;
        if removed {
            self.persist(&records);
        }
        removed
    }

    /// Remove every record already marked synced. Returns how many were
    /// dropped.
    pub fn clear_synced(&self) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|s| !s.synced);
        let cleared = before - records.len();
        if cleared > 0 {
            self.persist(&records);
        }
        cleared
    }

    /// Record a failed submission attempt: increments the retry counter,
    /// stamps the earliest next-attempt time, and persists. Returns the new
    /// count, or `None` when the id is unknown.
    pub fn record_failure(&self, id: Uuid, next_retry_at: DateTime<Utc>) -> Option<u32> {
        let mut records = self.lock();
        let count = match records.iter_mut().find(|s| s.id == id) {
            Some(sale) => {
                sale.retry_count += 1;
                sale.next_retry_at = Some(next_retry_at);
                Some(sale.retry_count)
            }
            None => None,
        };
        if count.is_some() {
            self.persist(&records);
        }
        count
    }

    /// All unsynced records, insertion order preserved.
    pub fn list_pending(&self) -> Vec<PendingSale> {
        self.lock().iter().filter(|s| !s.synced).cloned().collect()
    }

    /// Number of unsynced records.
    pub fn pending_count(&self) -> usize {
        self.lock().iter().filter(|s| !s.synced).count()
    }

    /// Total records held, synced or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rewrite the whole collection. Write failures are logged and absorbed:
    /// the in-memory state stays authoritative and the next mutation retries
    /// the write.
    fn persist(&self, records: &[PendingSale]) {
        let json = match serde_json::to_vec(records) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize sale queue; keeping in-memory state");
                return;
            }
        };

        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, &json) {
            warn!(path = %tmp.display(), error = %e, "failed to write sale queue");
            return;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to replace sale queue file");
        }
    }
}

/// Read the persisted collection. Missing file is a fresh install; anything
/// unparseable is discarded with a warning and the queue starts empty.
fn load_records(path: &Path) -> Vec<PendingSale> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read sale queue; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<PendingSale>>(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "sale queue file is corrupt; resetting to empty"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::SaleItem;

    fn draft(product: &str, total: f64) -> SaleDraft {
        SaleDraft {
            items: vec![SaleItem {
                product_id: product.into(),
                quantity: 1.0,
                unit_price: total,
                batch_id: None,
            }],
            total,
            customer_name: None,
            payment_method: "cash".into(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, QueueStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = QueueStore::open(dir.path().join("pending-sales.json"));
        (dir, store)
    }

    #[test]
    fn test_adds_preserve_count_and_insertion_order() {
        let (_dir, store) = temp_store();
        let a = store.add(draft("a", 1.0));
        let b = store.add(draft("b", 2.0));
        let c = store.add(draft("c", 3.0));

        let pending = store.list_pending();
        assert_eq!(pending.len(), 3);
        assert_eq!(
            pending.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![a, b, c]
        );
    }

    #[test]
    fn test_mark_synced_then_clear_synced_removes_exactly_that_record() {
        let (_dir, store) = temp_store();
        let a = store.add(draft("a", 1.0));
        let b = store.add(draft("b", 2.0));

        assert!(store.mark_synced(a));
        // Second mark is a no-op: synced transitions exactly once.
        assert!(!store.mark_synced(a));
        assert_eq!(store.pending_count(), 1);

        assert_eq!(store.clear_synced(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list_pending()[0].id, b);
    }

    #[test]
    fn test_remove_and_mark_synced_are_noops_for_unknown_ids() {
        let (_dir, store) = temp_store();
        store.add(draft("a", 1.0));
        assert!(!store.remove(Uuid::new_v4()));
        assert!(!store.mark_synced(Uuid::new_v4()));
        assert!(store.record_failure(Uuid::new_v4(), Utc::now()).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_record_failure_increments_and_stamps_next_attempt() {
        let (_dir, store) = temp_store();
        let id = store.add(draft("a", 1.0));
        let later = Utc::now() + chrono::Duration::seconds(30);
        assert_eq!(store.record_failure(id, Utc::now()), Some(1));
        assert_eq!(store.record_failure(id, later), Some(2));

        let pending = store.list_pending();
        assert_eq!(pending[0].retry_count, 2);
        assert_eq!(pending[0].next_retry_at, Some(later));
    }

    #[test]
    fn test_reload_yields_identical_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pending-sales.json");

        let store = QueueStore::open(&path);
        store.add(draft("a", 1.0));
        let b = store.add(draft("b", 2.0));
        store.mark_synced(b);
        let before: Vec<_> = store.lock().clone();
        drop(store);

        // Simulated restart.
        let reopened = QueueStore::open(&path);
        let after: Vec<_> = reopened.lock().clone();
        assert_eq!(before, after);
        assert_eq!(reopened.pending_count(), 1);
    }

    #[test]
    fn test_corrupt_file_resets_to_empty_and_stays_usable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pending-sales.json");
        fs::write(&path, b"{not json at all").unwrap();

        let store = QueueStore::open(&path);
        assert!(store.is_empty());

        // The store must keep working after the reset.
        store.add(draft("a", 1.0));
        drop(store);
        assert_eq!(QueueStore::open(&path).pending_count(), 1);
    }

    #[test]
    fn test_missing_file_is_fresh_install() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = QueueStore::open(dir.path().join("never-written.json"));
        assert!(store.is_empty());
    }
}
