//! HTTP error mapping for the Relay Service

use actix_web::{http::header, HttpResponse, ResponseError};
use thiserror::Error;

use deaddrop_core::RelayError;

/// Wrapper giving [`RelayError`] an HTTP response mapping
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub RelayError);

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            RelayError::MissingField(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": self.to_string()
            })),
            RelayError::KeyNotFound(_) | RelayError::RecipientNotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({
                    "success": false,
                    "error": self.to_string()
                }))
            }
            RelayError::RateLimited { retry_after } => {
                // Round up so "Retry-After: 0" never tells a client to
                // retry inside the window.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                HttpResponse::TooManyRequests()
                    .insert_header((header::RETRY_AFTER, secs.to_string()))
                    .json(serde_json::json!({
                        "success": false,
                        "error": self.to_string(),
                        "retry_after_secs": secs
                    }))
            }
            RelayError::PayloadTooLarge { .. } => {
                HttpResponse::PayloadTooLarge().json(serde_json::json!({
                    "success": false,
                    "error": self.to_string()
                }))
            }
            RelayError::Internal(_) => HttpResponse::InternalServerError().json(
                serde_json::json!({
                    "success": false,
                    "error": "internal server error"
                }),
            ),
        }
    }
}
