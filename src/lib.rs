//! # campdir
//!
//! REST directory of training programs, their courses, reviews and users,
//! built on axum and a JSON document store.
//!
//! ## Pieces
//!
//! - [`filtering`]: query-string grammar (`field[op]=value`, `select`,
//!   `sort`, `page`, `limit`) compiled into store predicates, projections
//!   and sort keys, plus the pagination window
//! - [`results`]: the list pipeline (count, window, fetch, populate) and
//!   the response envelopes
//! - [`geo`]: geocoding and radius queries
//! - [`lifecycle`]: derived child views and cascading deletes
//! - [`store`]: the [`DocumentStore`] trait with in-memory and sea-orm
//!   backends
//! - [`resources`]: static definitions of programs, courses, reviews and users
//! - [`routes`]: the axum router
//!
//! ```rust,ignore
//! use campdir::{AppConfig, AppState, MemoryStore, build_router};
//!
//! let config = AppConfig::default();
//! let geo = GeoResolver::new(build_geocoder(&config.geocoder())?, config.geo());
//! let state = AppState::new(Arc::new(MemoryStore::new()), config.query(), geo);
//! let app = build_router(&state)?;
//! ```

pub mod config;
pub mod errors;
pub mod filtering;
pub mod geo;
pub mod lifecycle;
pub mod models;
pub mod openapi;
pub mod operations;
pub mod resources;
pub mod results;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use config::{AppConfig, GeocoderConfig, QueryConfig};
pub use errors::{ApiError, CascadeStage};
pub use geo::geocoder::{Geocoder, GeocodingError, StaticGeocoder, build_geocoder};
pub use geo::{GeoConfig, GeoResolver};
pub use lifecycle::{CascadeOutcome, RelationshipLifecycle};
pub use operations::ResourceOperations;
pub use routes::build_router;
pub use state::AppState;
pub use store::{Document, DocumentStore, MemoryStore, SqlDocumentStore, StoreError};
pub use validation::{ValidationError, ValidationErrors};
