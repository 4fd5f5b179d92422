//! Session Cache - demo runner
//!
//! Loads the storage configuration from the environment, drives a synthetic
//! session workload against it and reports statistics until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_cache::{Storage, StorageConfig};

/// Time between two synthetic requests
const REQUEST_INTERVAL: Duration = Duration::from_millis(10);

/// Time between two statistics reports
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Main entry point for the session cache demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the storage (starts the background reclaimer)
/// 4. Start the synthetic workload and the stats reporter
/// 5. Stop everything gracefully on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session cache demo");

    let config = StorageConfig::from_env();
    config.validate()?;
    info!(
        "Configuration loaded: max_age={}s, capacity={}, gc_interval={}s",
        config.max_age, config.capacity, config.gc_interval
    );

    let storage: Arc<Storage<String>> = Arc::new(Storage::from_config(&config)?);

    let workload = spawn_workload(Arc::clone(&storage), config.capacity);
    let reporter = spawn_reporter(Arc::clone(&storage));
    info!("Workload started");

    shutdown_signal().await;

    workload.abort();
    reporter.abort();
    storage.shutdown().await;
    warn!("Workload and reclaimer stopped");

    info!("Final stats: {}", serde_json::to_string(&storage.stats())?);
    Ok(())
}

/// Opens, reads and closes sessions over a key space twice the capacity, so
/// the pool sees both growth and expiry.
fn spawn_workload(storage: Arc<Storage<String>>, capacity: usize) -> JoinHandle<()> {
    let key_space = capacity.saturating_mul(2).max(1);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REQUEST_INTERVAL);
        let mut request: usize = 0;

        loop {
            ticker.tick().await;
            request = request.wrapping_add(1);

            let sid = format!("sid-{}", request % key_space);
            match request % 4 {
                0 => {
                    let _ = storage.delete(&sid);
                }
                1 => {
                    if storage.add(&sid, format!("user-{}", request)).is_err() {
                        debug!("Session {} already open", sid);
                    }
                }
                _ => {
                    if storage.get(&sid).is_err() {
                        let _ = storage.set(&sid, format!("user-{}", request));
                    }
                }
            }
        }
    })
}

fn spawn_reporter(storage: Arc<Storage<String>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);
        loop {
            ticker.tick().await;
            match serde_json::to_string(&storage.stats()) {
                Ok(stats) => info!("Stats: {}", stats),
                Err(e) => warn!("Failed to serialize stats: {}", e),
            }
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
