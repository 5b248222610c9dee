use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use bill::BillError;
use common::error::ServiceError;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with, rendered as
/// `{"success": false, "error": ..., "field"?: ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Failed to generate bill.")]
    Bill(#[from] BillError),
    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Validation(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Service(ServiceError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::Persistence { .. }) | ApiError::Bill(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Service(ServiceError::Validation(failure)) => json!({
                "success": false,
                "error": failure.message,
                "field": failure.field,
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
