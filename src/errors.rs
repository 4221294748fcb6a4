//! # Error Handling
//!
//! Every failure in the query pipeline, the radius search and the cascade
//! delete ends up as exactly one [`ApiError`], which knows its HTTP status,
//! its user-facing message and what to log.
//!
//! Internal details (database errors, upstream geocoder failures, cascade
//! progress) are logged through `tracing` and never sent to clients.
//!
//! ```rust,ignore
//! use campdir::ApiError;
//!
//! async fn handler(state: State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
//!     let doc = state
//!         .store()
//!         .find_by_id("programs", &id)
//!         .await?
//!         .ok_or_else(|| ApiError::not_found("Program", Some(id)))?;
//!     Ok(Json(Value::Object(doc)))
//! }
//! ```

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::geo::geocoder::GeocodingError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Which step of a cascade delete failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStage {
    /// Removing the children of `collection` failed; the parent is still present.
    Children { collection: String },
    /// Children were removed but removing the parent itself failed.
    Parent,
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Children { collection } => write!(f, "children ({collection})"),
            Self::Parent => f.write_str("parent"),
        }
    }
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed query syntax or an input value that cannot be coerced
    Validation {
        /// User-facing error message
        message: String,
    },

    /// 404 Not Found - id-addressed lookup with no match
    NotFound {
        /// Resource type (e.g., "Program", "Course")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 409 Conflict - unique field already taken
    Conflict {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - request body failed resource validation
    ValidationFailed {
        /// User-facing validation errors
        errors: Vec<String>,
    },

    /// 404 when the address has no match, 502 when the provider is unreachable
    Geocoding(GeocodingError),

    /// 500 Internal Server Error - store failure (details logged, not exposed)
    Store(StoreError),

    /// 500 Internal Server Error - a cascade delete stopped part way through
    CascadeIntegrity {
        /// Parent resource type
        resource: String,
        /// Parent id
        id: String,
        /// The step that failed
        stage: CascadeStage,
        /// Children removed before the failure
        children_deleted: u64,
        /// Underlying store failure
        source: StoreError,
    },

    /// 500 Internal Server Error - invalid static wiring, raised at startup
    Configuration {
        /// Description of the misconfiguration
        message: String,
    },

    /// 500 Internal Server Error - generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 400 error for malformed query input
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::validation("Unsupported filter operator 'neq'"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a 422 Validation Failed error
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a startup configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Geocoding(GeocodingError::NoMatch { .. }) => StatusCode::NOT_FOUND,
            Self::Geocoding(GeocodingError::Unavailable { .. }) => StatusCode::BAD_GATEWAY,
            Self::Store(_)
            | Self::CascadeIntegrity { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } | Self::Conflict { message } => message.clone(),
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} not found with id '{id}'")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::Geocoding(GeocodingError::NoMatch { query }) => {
                format!("No location found for '{query}'")
            }
            Self::Geocoding(GeocodingError::Unavailable { .. }) => {
                "The geocoding service is unavailable".to_string()
            }
            Self::Store(_) => "A database error occurred".to_string(),
            Self::CascadeIntegrity { resource, id, .. } => {
                format!("Deleting {resource} '{id}' did not complete; related records may be inconsistent")
            }
            Self::Configuration { .. } => "Server misconfiguration".to_string(),
            Self::Internal { message, .. } => message.clone(),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Store(err) => {
                tracing::error!(error = %err, "Store error occurred");
            }
            Self::Geocoding(GeocodingError::Unavailable { reason }) => {
                tracing::error!(reason = %reason, "Geocoding provider unavailable");
            }
            Self::CascadeIntegrity {
                resource,
                id,
                stage,
                children_deleted,
                source,
            } => {
                tracing::error!(
                    resource = %resource,
                    id = %id,
                    stage = %stage,
                    children_deleted,
                    error = %source,
                    "Cascade delete aborted"
                );
            }
            Self::Configuration { message } => {
                tracing::error!(details = %message, "Configuration error");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to users (sanitized)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`
    pub success: bool,
    /// Error message
    pub error: String,
    /// Optional list of validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = match &self {
            Self::ValidationFailed { errors } => ErrorBody {
                success: false,
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorBody {
                success: false,
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Startup errors surface through the binary, so show the real cause.
            Self::Configuration { message } => write!(f, "configuration error: {message}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) | Self::CascadeIntegrity { source: err, .. } => Some(err),
            Self::Geocoding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::Store(StoreError::from(err))
    }
}

impl From<GeocodingError> for ApiError {
    fn from(err: GeocodingError) -> Self {
        Self::Geocoding(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.errors().iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = ApiError::validation("Unsupported filter operator 'neq'");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Unsupported filter operator 'neq'");
    }

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("Program", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Program not found with id '123'");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("Program", None);
        assert_eq!(err.user_message(), "Program not found");
    }

    #[test]
    fn test_validation_failed_multiple_errors() {
        let err = ApiError::validation_failed(vec![
            "name: is required".to_string(),
            "careers: is required".to_string(),
        ]);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.user_message(),
            "Validation failed: name: is required, careers: is required"
        );
    }

    #[test]
    fn test_geocoding_no_match_is_client_error() {
        let err = ApiError::from(GeocodingError::NoMatch {
            query: "00000".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.user_message().contains("00000"));
    }

    #[test]
    fn test_geocoding_unavailable_is_server_error() {
        let err = ApiError::from(GeocodingError::Unavailable {
            reason: "connection refused (10.0.0.3:443)".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        // Upstream details stay in the logs.
        assert!(!err.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_store_error_is_sanitized() {
        let err = ApiError::from(DbErr::Custom("disk I/O error at page 42".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }

    #[test]
    fn test_cascade_integrity_error() {
        let err = ApiError::CascadeIntegrity {
            resource: "Program".to_string(),
            id: "p1".to_string(),
            stage: CascadeStage::Children {
                collection: "courses".to_string(),
            },
            children_deleted: 0,
            source: StoreError::Backend("write failed".to_string()),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.user_message().contains("p1"));
        assert!(!err.user_message().contains("write failed"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_configuration_display_shows_cause() {
        let err = ApiError::configuration("unknown relation 'lessons' on programs");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("lessons"));
    }

    #[test]
    fn test_all_status_codes() {
        let test_cases = vec![
            (ApiError::validation("x"), StatusCode::BAD_REQUEST),
            (ApiError::not_found("Test", None), StatusCode::NOT_FOUND),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (
                ApiError::validation_failed(vec!["x".to_string()]),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::internal("x", None),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::configuration("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected_status) in test_cases {
            assert_eq!(err.status_code(), expected_status);
        }
    }
}
