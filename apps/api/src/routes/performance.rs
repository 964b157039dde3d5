//! # Performance Endpoint
//!
//! `GET /api/performance?period={month|quarter|year}&date={YYYY-MM-DD}`
//!
//! ```text
//! query string ──► parse_period ──┐
//!                                 ├──► AnalyticsService::performance ──► JSON
//! query string ──► parse_date ────┘        (cached period stats +
//!        │                                  transactions in window)
//!        └── invalid ──► 400 before any database work
//! ```
//!
//! ## Response
//! ```json
//! {
//!   "transactions": [ ... ],
//!   "commissionStats": { "period": "quarter", "currentPeriod": { ... }, ... },
//!   "period": "quarter",
//!   "customDate": "2024-03-10"
//! }
//! ```

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, error};

use comtrack_core::validation::{parse_period, parse_reference_date};
use comtrack_core::PerformanceData;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceQuery {
    pub period: Option<String>,
    pub date: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/performance", get(get_performance))
}

async fn get_performance(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Json<PerformanceData>> {
    let Query(query) = query?;
    debug!(?query, "GET /api/performance");

    let kind = parse_period(query.period.as_deref())?;
    let custom_date = query.date.filter(|raw| !raw.trim().is_empty());
    let reference = custom_date
        .as_deref()
        .map(parse_reference_date)
        .transpose()?;

    let data = state
        .service
        .performance(kind, reference, custom_date)
        .await
        .map_err(|e| {
            error!(period = %kind, error = %e, "Failed to fetch performance data");
            ApiError::from(e)
        })?;

    Ok(Json(data))
}
