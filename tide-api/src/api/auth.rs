//! Authentication middleware
//!
//! Protected routes require an API key in the `X-Api-Key` header. The key
//! resolves to a user account through its stored SHA-256 digest; the
//! account is placed in request extensions for handlers that need the
//! current actor.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use tide_common::api::auth::{authenticate, API_KEY_HEADER};
use tide_common::db::models::User;

use crate::AppState;

/// The authenticated user, stored in request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authentication middleware for protected routes.
///
/// Health endpoint does NOT use this middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingKey)?
        .to_string();

    let user = authenticate(&state.db, &api_key)
        .await
        .map_err(|e| AuthError::Other(e.to_string()))?
        .ok_or_else(|| {
            warn!("Rejected request with unknown API key");
            AuthError::UnknownKey
        })?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingKey,
    UnknownKey,
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingKey => (StatusCode::UNAUTHORIZED, "Missing API key".to_string()),
            AuthError::UnknownKey => (StatusCode::UNAUTHORIZED, "Unknown API key".to_string()),
            AuthError::Other(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication error: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
