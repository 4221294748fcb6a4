//! HTTP surface.
//!
//! Each resource gets a module of thin handlers generated by
//! `resource_handlers!`; they carry the OpenAPI annotations and forward to
//! the shared bodies in [`documents`]. Programs add the radius search and
//! the nested child routes on top.

pub mod documents;
pub mod programs;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

use crate::errors::ApiError;
use crate::openapi::ApiDoc;
use crate::resources::{COURSES, PROGRAMS, REVIEWS, USERS};
use crate::state::{AppState, ResourceState};

/// Base path of every resource route.
pub const API_PREFIX: &str = "/api/v1";

macro_rules! resource_handlers {
    ($module:ident, plural = $plural:literal, singular = $singular:literal) => {
        pub mod $module {
            use axum::{
                Json,
                extract::{Path, State, rejection::JsonRejection},
                http::StatusCode,
            };
            use utoipa_axum::{router::OpenApiRouter, routes};

            use crate::errors::{ApiError, ErrorBody};
            use crate::filtering::QueryRequest;
            use crate::models::ListParams;
            use crate::results::{ItemEnvelope, ResultEnvelope};
            use crate::routes::documents;
            use crate::state::ResourceState;
            use crate::store::Document;

            #[utoipa::path(
                get,
                path = "/",
                tag = $plural,
                params(ListParams),
                responses(
                    (status = 200, description = "One page of results", body = ResultEnvelope),
                    (status = 400, description = "Malformed query parameters", body = ErrorBody),
                    (status = 500, description = "Internal Server Error", body = ErrorBody)
                ),
                operation_id = concat!("list_", $plural),
                summary = concat!("List ", $plural),
                description = concat!(
                    "Filter, sort, project and paginate ", $plural,
                    ". Unknown query keys are treated as field filters."
                )
            )]
            pub async fn list_handler(
                State(state): State<ResourceState>,
                request: QueryRequest,
            ) -> Result<Json<ResultEnvelope>, ApiError> {
                documents::list(&state, &request).await
            }

            #[utoipa::path(
                get,
                path = "/{id}",
                tag = $plural,
                params(("id" = String, Path, description = "Document id")),
                responses(
                    (status = 200, description = "The requested document", body = ItemEnvelope),
                    (status = 404, description = "No document with this id", body = ErrorBody),
                    (status = 500, description = "Internal Server Error", body = ErrorBody)
                ),
                operation_id = concat!("get_one_", $singular),
                summary = concat!("Get one ", $singular)
            )]
            pub async fn get_one_handler(
                State(state): State<ResourceState>,
                Path(id): Path<String>,
            ) -> Result<Json<ItemEnvelope>, ApiError> {
                documents::get_one(&state, &id).await
            }

            #[utoipa::path(
                post,
                path = "/",
                tag = $plural,
                request_body(content = serde_json::Value, description = "Document fields"),
                responses(
                    (status = 201, description = "Document created", body = ItemEnvelope),
                    (status = 404, description = "Referenced document or address not found", body = ErrorBody),
                    (status = 409, description = "Unique field already taken", body = ErrorBody),
                    (status = 422, description = "Validation failed", body = ErrorBody),
                    (status = 502, description = "Geocoding provider unavailable", body = ErrorBody)
                ),
                operation_id = concat!("create_one_", $singular),
                summary = concat!("Create one ", $singular)
            )]
            pub async fn create_one_handler(
                State(state): State<ResourceState>,
                payload: Result<Json<Document>, JsonRejection>,
            ) -> Result<(StatusCode, Json<ItemEnvelope>), ApiError> {
                documents::create(&state, payload).await
            }

            #[utoipa::path(
                put,
                path = "/{id}",
                tag = $plural,
                params(("id" = String, Path, description = "Document id")),
                request_body(content = serde_json::Value, description = "Fields to change"),
                responses(
                    (status = 200, description = "Document updated", body = ItemEnvelope),
                    (status = 404, description = "No document with this id", body = ErrorBody),
                    (status = 409, description = "Unique field already taken", body = ErrorBody),
                    (status = 422, description = "Validation failed", body = ErrorBody)
                ),
                operation_id = concat!("update_one_", $singular),
                summary = concat!("Update one ", $singular)
            )]
            pub async fn update_one_handler(
                State(state): State<ResourceState>,
                Path(id): Path<String>,
                payload: Result<Json<Document>, JsonRejection>,
            ) -> Result<Json<ItemEnvelope>, ApiError> {
                documents::update(&state, &id, payload).await
            }

            #[utoipa::path(
                delete,
                path = "/{id}",
                tag = $plural,
                params(("id" = String, Path, description = "Document id")),
                responses(
                    (status = 200, description = "Document and its dependent documents deleted", body = ItemEnvelope),
                    (status = 404, description = "No document with this id", body = ErrorBody),
                    (status = 500, description = "Delete did not complete", body = ErrorBody)
                ),
                operation_id = concat!("delete_one_", $singular),
                summary = concat!("Delete one ", $singular)
            )]
            pub async fn delete_one_handler(
                State(state): State<ResourceState>,
                Path(id): Path<String>,
            ) -> Result<Json<ItemEnvelope>, ApiError> {
                documents::delete(&state, &id).await
            }

            /// Routes of the resource, before its state is attached.
            pub fn routes() -> OpenApiRouter<ResourceState> {
                OpenApiRouter::new()
                    .routes(routes!(list_handler))
                    .routes(routes!(create_one_handler))
                    .routes(routes!(get_one_handler))
                    .routes(routes!(update_one_handler))
                    .routes(routes!(delete_one_handler))
            }
        }
    };
}

resource_handlers!(program_handlers, plural = "programs", singular = "program");
resource_handlers!(course_handlers, plural = "courses", singular = "course");
resource_handlers!(review_handlers, plural = "reviews", singular = "review");
resource_handlers!(user_handlers, plural = "users", singular = "user");

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({"success": true, "status": "ok"}))
}

/// Assemble the application router.
///
/// # Errors
///
/// Returns a configuration error when a resource declares a population on
/// a relation it does not have.
pub fn build_router(state: &AppState) -> Result<Router, ApiError> {
    let nest = |resource| ResourceState::bind(state, resource);

    let (router, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest(
            &format!("{API_PREFIX}/programs"),
            programs::routes().with_state(nest(&PROGRAMS)?),
        )
        .nest(
            &format!("{API_PREFIX}/courses"),
            course_handlers::routes().with_state(nest(&COURSES)?),
        )
        .nest(
            &format!("{API_PREFIX}/reviews"),
            review_handlers::routes().with_state(nest(&REVIEWS)?),
        )
        .nest(
            &format!("{API_PREFIX}/users"),
            user_handlers::routes().with_state(nest(&USERS)?),
        )
        .split_for_parts();

    let document = openapi.clone();
    Ok(router
        .route("/health", get(health))
        .route(
            "/api-docs/openapi.json",
            get(move || {
                let document = document.clone();
                async move { Json(document) }
            }),
        )
        .merge(Scalar::with_url("/docs", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
