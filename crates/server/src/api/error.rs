//! Mapping of catalog and validation failures onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use cinecache_core::CatalogError;

use super::validation::{FieldError, ValidationErrors};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    /// Body could not be parsed as the expected JSON.
    BadBody(String),
    Catalog(CatalogError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Catalog(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

/// Status for a catalog failure. An upstream 429 becomes 503 so clients back off.
pub fn catalog_status(e: &CatalogError) -> StatusCode {
    match e {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Upstream {
            status: Some(429), ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        CatalogError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "validation failed".to_string(),
                    details: errors.into_details(),
                },
            ),
            ApiError::BadBody(message) => (StatusCode::BAD_REQUEST, ErrorResponse::new(message)),
            ApiError::Catalog(e) => {
                let status = catalog_status(&e);
                let message = match &e {
                    CatalogError::Storage(detail) => {
                        error!("Storage failure: {}", detail);
                        "internal storage error".to_string()
                    }
                    other => other.to_string(),
                };
                (status, ErrorResponse::new(message))
            }
        };

        (status, Json(body)).into_response()
    }
}
