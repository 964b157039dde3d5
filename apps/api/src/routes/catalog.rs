//! Entity types (product categories) and entities (partners).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use comtrack_core::{EntityType, EntityWithType, NewEntity, NewEntityType};

use super::Envelope;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entity-types", get(list_entity_types).post(create_entity_type))
        .route("/entities", get(list_entities).post(create_entity))
}

async fn list_entity_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<EntityType>>>> {
    Ok(Envelope::ok(state.service.list_entity_types().await?))
}

async fn create_entity_type(
    State(state): State<AppState>,
    body: Result<Json<NewEntityType>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let created = state.service.create_entity_type(&input).await?;

    Ok(Envelope::created(created, "Entity type created"))
}

async fn list_entities(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<EntityWithType>>>> {
    Ok(Envelope::ok(state.service.list_entities().await?))
}

async fn create_entity(
    State(state): State<AppState>,
    body: Result<Json<NewEntity>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let created = state.service.create_entity(&input).await?;

    Ok(Envelope::created(created, "Entity created"))
}
