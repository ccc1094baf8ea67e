//! Error types for the sync subsystem.
//!
//! Storage failures never surface here: the queue store logs and absorbs
//! them so the caller-facing API stays infallible. What remains is the
//! submission path and configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// A single sale submission attempt failed. Either way the record stays
/// queued and its retry counter is bumped; the distinction only matters for
/// logging.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Transport-level failure: the request never produced an answer we
    /// could interpret (DNS, connect, timeout, dropped connection).
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered and said no (HTTP error status or an explicit
    /// failure body).
    #[error("endpoint rejected sale: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
