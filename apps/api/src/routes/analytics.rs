use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, error};

use comtrack_core::{AnalyticsData, LandingPageData};

use super::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/landing", get(get_landing))
}

/// Entity types, entities, transactions and every headline figure.
async fn get_dashboard(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<AnalyticsData>>> {
    let data = state.service.dashboard().await.map_err(|e| {
        error!(error = %e, "Failed to build analytics dashboard");
        ApiError::from(e)
    })?;

    debug!(
        entity_types = data.entity_types.len(),
        entities = data.entities.len(),
        transactions = data.transactions.transactions.len(),
        "GET /api/analytics"
    );
    Ok(Envelope::ok(data))
}

async fn get_landing(State(state): State<AppState>) -> ApiResult<Json<Envelope<LandingPageData>>> {
    let data = state.service.landing_page().await.map_err(|e| {
        error!(error = %e, "Failed to build landing page data");
        ApiError::from(e)
    })?;

    Ok(Envelope::ok(data))
}
