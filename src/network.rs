//! Connectivity monitor.
//!
//! The monitor itself is purely event-driven: a platform adapter calls
//! [`NetworkMonitor::notify`] once per connectivity transition and every
//! subscriber fires once per call. There is no debouncing — a rapid flap
//! produces a matching callback per event, by contract. The HEAD-probe
//! helper is for adapters on platforms without a native connectivity
//! signal (the service binary uses it against the dashboard health URL).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

type Subscriber = Box<dyn Fn(bool) + Send + Sync>;

/// Current online flag plus an observer list notified on each transition
/// event.
pub struct NetworkMonitor {
    online: AtomicBool,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a callback invoked with the new online flag on every
    /// transition event.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.push(Box::new(callback));
    }

    /// Feed one platform transition event into the monitor. Updates the
    /// current flag and invokes every subscriber exactly once for this
    /// event.
    pub fn notify(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        debug!(online, "connectivity transition");
        let subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for callback in subs.iter() {
            callback(online);
        }
    }
}

/// Probe timeout. Kept short so an offline terminal notices quickly.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One reachability check against the remote health endpoint: HEAD request,
/// short timeout, any 2xx counts as online. Never errors — an unreachable
/// endpoint simply reads as offline.
pub async fn probe(client: &reqwest::Client, health_url: &str, api_key: Option<&str>) -> bool {
    let mut request = client.head(health_url);
    if let Some(key) = api_key {
        request = request.header("X-POS-API-Key", key);
    }
    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(url = health_url, error = %e, "health probe failed");
            false
        }
    }
}

/// Build the client used for probing. Falls back to an unconfigured default
/// client if the builder fails (it only does on TLS backend misconfig).
pub fn probe_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build probe client; using default");
            reqwest::Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_flag_and_updates() {
        let monitor = NetworkMonitor::new(false);
        assert!(!monitor.is_online());
        monitor.notify(true);
        assert!(monitor.is_online());
        monitor.notify(false);
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_each_transition_event_fires_every_subscriber_once() {
        let monitor = NetworkMonitor::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        monitor.subscribe(move |online| sink.lock().unwrap().push(online));

        // A rapid flap: one callback per event, no suppression.
        monitor.notify(true);
        monitor.notify(false);
        monitor.notify(true);
        monitor.notify(true);

        assert_eq!(*seen.lock().unwrap(), vec![true, false, true, true]);
    }

    #[test]
    fn test_multiple_subscribers_all_fire() {
        let monitor = NetworkMonitor::new(true);
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let a = first.clone();
        monitor.subscribe(move |_| *a.lock().unwrap() += 1);
        let b = second.clone();
        monitor.subscribe(move |_| *b.lock().unwrap() += 1);

        monitor.notify(false);
        assert_eq!(*first.lock().unwrap(), 1);
        assert_eq!(*second.lock().unwrap(), 1);
    }
}
