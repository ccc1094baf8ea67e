//! Sale records queued for remote submission.
//!
//! Field names serialize in camelCase to match the admin dashboard payload
//! shape; the same representation is used for the on-disk queue file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Stock batch the quantity was consumed from, when the caller tracks
    /// batches (FEFO is resolved upstream; we only carry the reference).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Caller-supplied part of a sale, before the queue assigns identity and
/// sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub items: Vec<SaleItem>,
    /// Total computed at checkout time. Never re-derived later.
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub payment_method: String,
}

/// A sale recorded locally but not yet confirmed on the remote system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSale {
    pub id: Uuid,
    pub items: Vec<SaleItem>,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    /// False until the remote submission succeeds. Transitions false→true
    /// exactly once, never reversed.
    pub synced: bool,
    /// Failed submission attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Earliest time the next submission attempt is allowed. Stamped by the
    /// sync engine on failure; `None` until the first failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl PendingSale {
    /// Build a queued record from a draft. Called by the queue store at
    /// enqueue time.
    pub(crate) fn from_draft(draft: SaleDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            items: draft.items,
            total: draft.total,
            customer_name: draft.customer_name,
            payment_method: draft.payment_method,
            created_at: Utc::now(),
            synced: false,
            retry_count: 0,
            next_retry_at: None,
        }
    }
}
