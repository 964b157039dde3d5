//! Transaction endpoints. Every successful write clears the stats caches.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::error;

use comtrack_core::{
    EntityTransaction, NewEntityTransaction, TransactionCorrection, TransactionsData,
    ValidationError,
};

use super::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTransactionsQuery {
    pub entity_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/{id}", patch(correct_transaction))
        .route("/entity-transactions", get(list_entity_transactions))
}

async fn list_transactions(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<TransactionsData>>> {
    let data = state.service.transactions_data().await.map_err(|e| {
        error!(error = %e, "Failed to fetch transactions data");
        ApiError::from(e)
    })?;

    Ok(Envelope::ok(data))
}

async fn create_transaction(
    State(state): State<AppState>,
    body: Result<Json<NewEntityTransaction>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let created = state.service.create_transaction(&input).await?;

    Ok(Envelope::created(created, "Transaction recorded"))
}

async fn correct_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransactionCorrection>, JsonRejection>,
) -> ApiResult<Json<Envelope<EntityTransaction>>> {
    let Json(correction) = body?;
    let corrected = state.service.correct_transaction(&id, &correction).await?;

    Ok(Envelope::ok(corrected))
}

async fn list_entity_transactions(
    State(state): State<AppState>,
    query: Result<Query<EntityTransactionsQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<EntityTransaction>>>> {
    let Query(query) = query?;
    let entity_id = query
        .entity_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::required("entityId"))?;

    let transactions = state.service.entity_transactions(&entity_id).await?;
    Ok(Envelope::ok(transactions))
}
