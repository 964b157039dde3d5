//! # comtrack-api: HTTP Server for the Commission Dashboard
//!
//! Serves period-over-period commission statistics and the dashboard data
//! behind them.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP ──► TraceLayer ──► CorsLayer ──► routes::* handler              │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                   AnalyticsService                     │
//! │                                   ├── StatsCache<CommissionOverview>   │
//! │                                   ├── StatsCache<PeriodStats>          │
//! │                                   ├── Clock (system / manual)          │
//! │                                   └── Database (comtrack-db)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - TOML + environment configuration
//! - [`cache`] - TTL cache with an injectable clock
//! - [`service`] - Cached analytics and write paths
//! - [`routes`] - axum handlers
//! - [`error`] - `ApiError` and its HTTP mapping

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod service;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::AnalyticsService;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalyticsService>,
}

impl AppState {
    pub fn new(service: AnalyticsService) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}

/// Builds the application router with tracing and CORS middleware.
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================
