use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// `OK` while the database answers, `503` otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.service.db().health_check().await {
        (StatusCode::OK, "OK")
    } else {
        warn!("Health check failed: database unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    }
}
