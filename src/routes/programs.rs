//! Routes only programs have: radius search and nested children.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::documents;
use super::program_handlers;
use crate::errors::{ApiError, ErrorBody};
use crate::models::RadiusParams;
use crate::results::{ItemEnvelope, ResultEnvelope};
use crate::state::ResourceState;
use crate::store::Document;

#[utoipa::path(
    get,
    path = "/radius/{zipcode}/{distance}",
    tag = "programs",
    params(RadiusParams),
    responses(
        (status = 200, description = "Programs inside the radius", body = ResultEnvelope),
        (status = 400, description = "Distance is not a non-negative number", body = ErrorBody),
        (status = 404, description = "The address could not be geocoded", body = ErrorBody),
        (status = 502, description = "Geocoding provider unavailable", body = ErrorBody)
    ),
    operation_id = "programs_in_radius",
    summary = "Programs within a distance of an address"
)]
pub async fn radius_handler(
    State(state): State<ResourceState>,
    Path(RadiusParams { zipcode, distance }): Path<RadiusParams>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    documents::radius_search(&state, &zipcode, &distance).await
}

#[utoipa::path(
    get,
    path = "/{id}/{relation}",
    tag = "programs",
    params(
        ("id" = String, Path, description = "Program id"),
        ("relation" = String, Path, description = "`courses` or `reviews`")
    ),
    responses(
        (status = 200, description = "Every child of the program", body = ResultEnvelope),
        (status = 404, description = "Unknown program or relation", body = ErrorBody)
    ),
    operation_id = "list_program_children",
    summary = "List a program's courses or reviews"
)]
pub async fn list_children_handler(
    State(state): State<ResourceState>,
    Path((id, relation)): Path<(String, String)>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    documents::list_children(&state, &id, &relation).await
}

#[utoipa::path(
    post,
    path = "/{id}/{relation}",
    tag = "programs",
    params(
        ("id" = String, Path, description = "Program id"),
        ("relation" = String, Path, description = "`courses` or `reviews`")
    ),
    request_body(content = serde_json::Value, description = "Child fields; the program reference is set from the path"),
    responses(
        (status = 201, description = "Child created", body = ItemEnvelope),
        (status = 404, description = "Unknown program or relation", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    ),
    operation_id = "create_program_child",
    summary = "Add a course or review to a program"
)]
pub async fn create_child_handler(
    State(state): State<ResourceState>,
    Path((id, relation)): Path<(String, String)>,
    payload: Result<Json<Document>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemEnvelope>), ApiError> {
    documents::create_child(&state, &id, &relation, payload).await
}

pub fn routes() -> OpenApiRouter<ResourceState> {
    program_handlers::routes()
        .routes(routes!(radius_handler))
        .routes(routes!(list_children_handler))
        .routes(routes!(create_child_handler))
}
