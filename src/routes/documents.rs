//! Handler bodies shared by every resource.
//!
//! The per-resource handlers generated by [`resource_handlers!`](crate::resource_handlers)
//! only carry the OpenAPI annotations and forward here.

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};

use crate::errors::ApiError;
use crate::filtering::QueryRequest;
use crate::results::{ItemEnvelope, ResultEnvelope};
use crate::state::ResourceState;
use crate::store::Document;

pub async fn list(state: &ResourceState, request: &QueryRequest) -> Result<Json<ResultEnvelope>, ApiError> {
    let envelope = state
        .app
        .results()
        .list(state.resource, request, state.list_population.as_ref())
        .await?;
    Ok(Json(envelope))
}

pub async fn get_one(state: &ResourceState, id: &str) -> Result<Json<ItemEnvelope>, ApiError> {
    let doc = state
        .app
        .operations()
        .get_one(state.resource, id, state.item_population.as_ref())
        .await?;
    Ok(Json(ItemEnvelope::new(doc)))
}

pub async fn create(
    state: &ResourceState,
    payload: Result<Json<Document>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemEnvelope>), ApiError> {
    let Json(body) = payload?;
    let created = state.app.operations().create(state.resource, body).await?;
    Ok((StatusCode::CREATED, Json(ItemEnvelope::new(created))))
}

pub async fn update(
    state: &ResourceState,
    id: &str,
    payload: Result<Json<Document>, JsonRejection>,
) -> Result<Json<ItemEnvelope>, ApiError> {
    let Json(changes) = payload?;
    let updated = state.app.operations().update(state.resource, id, changes).await?;
    Ok(Json(ItemEnvelope::new(updated)))
}

pub async fn delete(state: &ResourceState, id: &str) -> Result<Json<ItemEnvelope>, ApiError> {
    state.app.operations().delete(state.resource, id).await?;
    Ok(Json(ItemEnvelope::empty()))
}

pub async fn list_children(
    state: &ResourceState,
    parent_id: &str,
    relation: &str,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let children = state
        .app
        .operations()
        .list_children(state.resource, relation, parent_id)
        .await?;
    Ok(Json(ResultEnvelope::unpaged(children)))
}

pub async fn create_child(
    state: &ResourceState,
    parent_id: &str,
    relation: &str,
    payload: Result<Json<Document>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemEnvelope>), ApiError> {
    let Json(body) = payload?;
    let created = state
        .app
        .operations()
        .create_child(state.resource, relation, parent_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(ItemEnvelope::new(created))))
}

/// Documents whose geocoded location lies within `distance` of `address`.
pub async fn radius_search(
    state: &ResourceState,
    address: &str,
    distance: &str,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let Some(rule) = state.resource.geocode else {
        return Err(ApiError::not_found(
            format!("Radius search on {}", state.resource.collection),
            None,
        ));
    };
    let distance: f64 = distance
        .trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("Distance must be a number, got '{distance}'")))?;

    let geo = state.app.geo();
    let radius = geo.resolve_radius(address, distance, geo.config().unit).await?;
    let docs = state
        .app
        .store()
        .find_within(state.resource.collection, rule.location_field, &radius)
        .await?;
    Ok(Json(ResultEnvelope::unpaged(docs)))
}
