//! Service configuration.
//!
//! One JSON file, snake_case keys, every field optional with a sensible
//! default. A missing file is a fresh terminal running on defaults; a
//! malformed file is the one startup error we refuse to paper over.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::RetryPolicy;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote sale-submission route.
    pub endpoint_url: String,
    /// Terminal API key sent as `X-POS-API-Key`. Absent on unprovisioned
    /// terminals; the queue still accepts sales, sync just keeps failing.
    pub api_key: Option<String>,
    /// Health-check URL for the connectivity probe. Derived from
    /// `endpoint_url` when not set explicitly.
    pub health_url: Option<String>,
    /// Storage key for the pending-sale queue.
    pub queue_path: PathBuf,
    pub sync_interval_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:3000/api/pos/sales/sync".into(),
            api_key: None,
            health_url: None,
            queue_path: PathBuf::from("pending-sales.json"),
            sync_interval_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_slice(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The URL the connectivity probe targets: the explicit `health_url`
    /// when configured, otherwise `/api/health` on the endpoint's origin.
    pub fn probe_url(&self) -> String {
        if let Some(url) = &self.health_url {
            return url.clone();
        }
        match reqwest::Url::parse(&self.endpoint_url) {
            Ok(url) => format!("{}/api/health", url.origin().ascii_serialization()),
            Err(_) => self.endpoint_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_interval_secs, 30);
        assert_eq!(config.queue_path, PathBuf::from("pending-sales.json"));
        assert_eq!(config.retry.max_attempts, Some(10));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SyncConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("salesync.json");
        fs::write(
            &path,
            r#"{"endpoint_url":"https://admin.example.com/api/pos/sales/sync","api_key":"tk-1"}"#,
        )
        .unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("tk-1"));
        assert_eq!(config.sync_interval_secs, 30);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("salesync.json");
        fs::write(&path, b"{broken").unwrap();
        assert!(matches!(
            SyncConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_probe_url_derived_from_endpoint_origin() {
        let config = SyncConfig {
            endpoint_url: "https://admin.example.com:8443/api/pos/sales/sync".into(),
            ..SyncConfig::default()
        };
        assert_eq!(
            config.probe_url(),
            "https://admin.example.com:8443/api/health"
        );

        let explicit = SyncConfig {
            health_url: Some("https://status.example.com/ping".into()),
            ..config
        };
        assert_eq!(explicit.probe_url(), "https://status.example.com/ping");
    }
}
