//! salesync service binary.
//!
//! Wires the queue store, connectivity probe, and sync loop together and
//! runs until ctrl-c. The probe feeds platform-level transitions into the
//! network monitor; a reconnect triggers an immediate sync pass instead of
//! waiting for the next interval tick.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use salesync::{
    network, spawn_sync_loop, HttpEndpoint, NetworkMonitor, QueueStore, StatusReporter,
    SyncConfig, SyncEngine, SyncState,
};

const LOG_DIR: &str = "logs";
const PROBE_INTERVAL: Duration = Duration::from_secs(10);

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,salesync=debug"));

    std::fs::create_dir_all(LOG_DIR).ok();
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "salesync");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the process lifetime; dropping it flushes.
    std::mem::forget(guard);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting salesync v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os("SALESYNC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("salesync.json"));
    let config = SyncConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let store = Arc::new(QueueStore::open(&config.queue_path));
    if store.pending_count() > 0 {
        info!(
            pending = store.pending_count(),
            "recovered queued sales from previous session"
        );
    }

    let monitor = Arc::new(NetworkMonitor::new(false));
    let state = Arc::new(SyncState::new());
    let endpoint = HttpEndpoint::new(config.endpoint_url.clone(), config.api_key.clone());
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        endpoint,
        config.retry.clone(),
        state.clone(),
    ));
    let reporter = StatusReporter::new(store.clone(), monitor.clone(), state);

    let running = Arc::new(AtomicBool::new(true));
    let (trigger_tx, trigger_rx) = mpsc::channel::<()>(8);

    // Reconnect nudges the sync loop for an immediate pass.
    let reconnect = trigger_tx.clone();
    monitor.subscribe(move |online| {
        if online {
            let _ = reconnect.try_send(());
        }
    });

    // Connectivity probe: HEAD against the health URL, notifying the
    // monitor only on actual transitions (the platform event adapter).
    let probe_handle = {
        let monitor = monitor.clone();
        let running = running.clone();
        let probe_url = config.probe_url();
        let api_key = config.api_key.clone();
        tokio::spawn(async move {
            let client = network::probe_client();
            let mut previous: Option<bool> = None;
            while running.load(Ordering::SeqCst) {
                let online = network::probe(&client, &probe_url, api_key.as_deref()).await;
                if previous != Some(online) {
                    monitor.notify(online);
                }
                previous = Some(online);
                tokio::time::sleep(PROBE_INTERVAL).await;
            }
        })
    };

    let sync_handle = spawn_sync_loop(
        engine,
        monitor,
        Duration::from_secs(config.sync_interval_secs.max(1)),
        trigger_rx,
        running.clone(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown requested");
    let status = reporter.report();
    if status.has_pending {
        warn!(
            pending = status.pending_items,
            "shutting down with sales still queued; they will sync next start"
        );
    }

    running.store(false, Ordering::SeqCst);
    // Wake the loop so it observes the cleared flag without waiting out
    // a full interval tick.
    let _ = trigger_tx.try_send(());
    drop(trigger_tx);
    probe_handle.abort();
    let _ = sync_handle.await;
    info!("Stopped");
    Ok(())
}
