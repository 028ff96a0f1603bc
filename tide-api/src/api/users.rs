//! User capability endpoint
//!
//! CRUD toggle for the alter_dot_org_project capability, the flag that
//! authorizes an API client to re-trigger WordPress.org-hosted audits.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tide_common::db::queries;

use crate::AppState;

/// PUT body for the capability toggle
#[derive(Debug, Deserialize)]
pub struct CapabilityUpdate {
    pub alter_dot_org_project: bool,
}

/// Capability state response
#[derive(Debug, Serialize)]
pub struct CapabilityResponse {
    pub login: String,
    pub alter_dot_org_project: bool,
}

/// PUT /tide/v1/users/:login/capabilities
pub async fn set_capabilities(
    State(state): State<AppState>,
    Path(login): Path<String>,
    Json(update): Json<CapabilityUpdate>,
) -> Result<Json<CapabilityResponse>, UserError> {
    let updated = queries::set_user_capability(&state.db, &login, update.alter_dot_org_project)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

    if !updated {
        return Err(UserError::NotFound(login));
    }

    Ok(Json(CapabilityResponse {
        login,
        alter_dot_org_project: update.alter_dot_org_project,
    }))
}

/// User API errors
#[derive(Debug)]
pub enum UserError {
    NotFound(String),
    DatabaseError(String),
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            UserError::NotFound(login) => {
                (StatusCode::NOT_FOUND, format!("User not found: {}", login))
            }
            UserError::DatabaseError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {}", msg))
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
