use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::orchestrator::GenerationStage;

pub const FORBIDDEN_CONTENT_DETAIL: &str = "Sensitive secrets detected in input.";
const TIMEOUT_DETAIL: &str = "Request timeout. Please try again with shorter content.";
const RATE_LIMIT_DETAIL: &str = "Rate limit exceeded. Please slow down your requests.";
const UNEXPECTED_DETAIL: &str = "An unexpected error occurred. Please try again later.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// The HTTP status is decided here and nowhere else.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client-fixable input problem; the message is returned verbatim.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("{stage} generation exceeded its deadline")]
    GenerationTimeout { stage: GenerationStage },

    #[error("{stage} generation returned empty content")]
    EmptyGeneration { stage: GenerationStage },

    #[error("Provider error during {stage} generation: {detail}")]
    Provider {
        stage: GenerationStage,
        detail: String,
    },
}

impl AppError {
    /// Seconds advertised in `Retry-After`: rounded up, never zero.
    fn retry_after_secs(retry_after: Duration) -> u64 {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        secs.max(1)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Empty/provider failures are logged by the orchestrator with request context.
        let (status, detail) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::RateLimited { retry_after } => {
                let secs = Self::retry_after_secs(*retry_after);
                let body = Json(json!({
                    "detail": RATE_LIMIT_DETAIL,
                    "retry_after": secs,
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                return response;
            }
            AppError::GenerationTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, TIMEOUT_DETAIL.to_string())
            }
            AppError::EmptyGeneration { stage } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate {}. Please try again.", stage.noun()),
            ),
            AppError::Provider { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_DETAIL.to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
