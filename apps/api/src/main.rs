//! # ComTrack API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load ApiConfig (api.toml + COMTRACK_* env)                         │
//! │  2. Install tracing subscriber (RUST_LOG or server.log_filter)         │
//! │  3. Open SQLite pool, run migrations                                   │
//! │  4. Build AnalyticsService (SystemClock, empty caches)                 │
//! │  5. Serve axum router until Ctrl+C / SIGTERM                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `comtrack-api [CONFIG_PATH]` (or set `COMTRACK_CONFIG`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use comtrack_api::cache::SystemClock;
use comtrack_api::config::ApiConfig;
use comtrack_api::service::AnalyticsService;
use comtrack_api::{build_router, AppState};
use comtrack_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("COMTRACK_CONFIG").ok())
        .map(PathBuf::from);

    let config = ApiConfig::load(config_path).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database.path.display(),
        ttl_secs = config.cache.ttl_secs,
        "Starting ComTrack API"
    );

    let db_config = DbConfig::new(config.database.path.clone())
        .max_connections(config.database.max_connections);
    let db = Database::new(db_config)
        .await
        .context("Failed to open database")?;

    let service = AnalyticsService::new(db.clone(), Arc::new(SystemClock), &config.cache);
    let app = build_router(AppState::new(service));

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
