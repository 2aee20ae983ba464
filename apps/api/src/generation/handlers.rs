//! Axum route handlers for the Generation API.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::errors::AppError;
use crate::generation::orchestrator::{generate_all, GenerationRequest};
use crate::rate_limit::Caller;
use crate::routes::auth::AuthenticatedClient;
use crate::state::AppState;

/// POST /generate/all
///
/// Generates a cover letter and resume bullets in one call.
/// Malformed or incomplete bodies are reported as 422 with a `detail` message;
/// other extractor failures (oversized body) keep axum's status.
pub async fn handle_generate_all(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    client: Option<Extension<AuthenticatedClient>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(
            rejection @ (JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_)),
        ) => return Err(AppError::Validation(rejection.body_text())),
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let caller = Caller {
        credential: client.map(|Extension(AuthenticatedClient(key))| key),
        addr: connect_info.map(|ConnectInfo(addr)| addr.ip()),
    };

    let response = generate_all(&state, &caller, request).await?;
    Ok(Json(response).into_response())
}
