//! salesync — offline sale queue and sync engine for POS terminals.
//!
//! Sales made without connectivity are persisted to a local queue file and
//! replayed against the admin dashboard once the network returns. The
//! pieces: [`queue::QueueStore`] (durable pending-sale collection),
//! [`network::NetworkMonitor`] (connectivity flag + transition observers),
//! [`engine::SyncEngine`] (FIFO drain with bounded retries and backoff),
//! and [`status::StatusReporter`] (read-side aggregate for the UI).
//!
//! Delivery to the endpoint is at-least-once; every payload carries the
//! client-generated sale id so the server can deduplicate replays.

pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod network;
pub mod queue;
pub mod sale;
pub mod status;

pub use config::SyncConfig;
pub use endpoint::{HttpEndpoint, SaleEndpoint};
pub use engine::{spawn_sync_loop, PassOutcome, RetryPolicy, SyncEngine, SyncState};
pub use error::{ConfigError, SubmitError};
pub use network::NetworkMonitor;
pub use queue::QueueStore;
pub use sale::{PendingSale, SaleDraft, SaleItem};
pub use status::{StatusReporter, SyncStatus};
