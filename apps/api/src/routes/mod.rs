//! # HTTP Routes
//!
//! ```text
//! GET    /health
//! GET    /api/performance?period=&date=
//! GET    /api/analytics
//! GET    /api/analytics/landing
//! GET    /api/analytics/transactions
//! POST   /api/analytics/transactions
//! PATCH  /api/analytics/transactions/{id}
//! GET    /api/analytics/entity-transactions?entityId=
//! GET    /api/analytics/entity-types        POST /api/analytics/entity-types
//! GET    /api/analytics/entities            POST /api/analytics/entities
//! ```
//!
//! Handlers under `/api/analytics` answer with an [`Envelope`].
//! `/api/performance` returns its payload bare.

pub mod analytics;
pub mod catalog;
pub mod health;
pub mod performance;
pub mod transactions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

/// Success wrapper used by the analytics endpoints.
///
/// ```json
/// { "success": true, "data": { ... }, "message": "Transaction recorded" }
/// ```
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Envelope {
            success: true,
            data,
            message: None,
        })
    }

    /// `201 Created` with a confirmation message.
    pub fn created(data: T, message: impl Into<String>) -> Response {
        let body = Envelope {
            success: true,
            data,
            message: Some(message.into()),
        };
        (StatusCode::CREATED, Json(body)).into_response()
    }
}

/// All routes, without middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(performance::router())
        .nest(
            "/api/analytics",
            Router::new()
                .merge(analytics::router())
                .merge(transactions::router())
                .merge(catalog::router()),
        )
}
