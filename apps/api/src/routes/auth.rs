use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Credential that passed the static key check, stored in request extensions
/// so handlers can rate limit by it.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub String);

/// Rejects requests whose `X-API-Key` doesn't match the configured credential.
/// With no credential configured every request passes unauthenticated.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    match provided {
        Some(key) if key == expected => {
            request.extensions_mut().insert(AuthenticatedClient(key));
            Ok(next.run(request).await)
        }
        _ => Err(AppError::Unauthorized),
    }
}
