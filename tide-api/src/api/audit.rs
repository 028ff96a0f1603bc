//! Audit endpoints
//!
//! The alternate-id endpoint addresses an audit by project identity and
//! runs the lookup outcome through the WordPress.org interceptor before
//! responding, so wporg-originated requests can re-trigger or materialize
//! audits as a side effect of the read.

use axum::{
    extract::{Extension, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use tide_common::db::models::Audit;
use tide_common::db::queries;
use tide_common::LookupError;

use crate::api::auth::CurrentUser;
use crate::wporg::{RequestContext, RestRequest};
use crate::AppState;

/// Query parameters of the alternate-id endpoint
#[derive(Debug, Deserialize)]
pub struct AltidQuery {
    /// Originating client tag (e.g. "wporg")
    pub project_client: Option<String>,
}

/// GET /tide/v1/audit/wporg/:project_type/:project_slug/:version
///
/// Resolve an audit by project identity. The raw lookup outcome passes
/// through the WordPress.org interceptor, which may create a stub record
/// or re-dispatch an existing one before the response is rendered.
pub async fn get_audit_by_altid(
    State(state): State<AppState>,
    method: Method,
    Path((project_type, project_slug, version)): Path<(String, String, String)>,
    Query(query): Query<AltidQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Audit>, AuditError> {
    let route = format!(
        "tide/v1/audit/wporg/{}/{}/{}",
        project_type, project_slug, version
    );

    let mut request = RestRequest::new(method, route);
    request.set_param("project_type", project_type.as_str());
    request.set_param("project_slug", project_slug.as_str());
    request.set_param("version", version.as_str());
    if let Some(client) = &query.project_client {
        request.set_param("project_client", client.as_str());
    }

    let mut ctx = RequestContext::for_user(user);

    let outcome =
        queries::find_audit_by_altid(&state.db, &project_type, &project_slug, &version).await;
    let outcome = state.wporg.intercept(outcome, &request, &mut ctx).await;

    match outcome {
        Ok(audit) => Ok(Json(audit)),
        Err(LookupError::InvalidAltidLookup) => Err(AuditError::NotFound(format!(
            "{}/{}/{}",
            project_type, project_slug, version
        ))),
        Err(LookupError::Db(msg)) => Err(AuditError::DatabaseError(msg)),
    }
}

/// GET /tide/v1/audit/:guid
///
/// Direct record fetch.
pub async fn get_audit_by_guid(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> Result<Json<Audit>, AuditError> {
    let audit = queries::get_audit(&state.db, &guid)
        .await
        .map_err(|e| AuditError::DatabaseError(e.to_string()))?;

    audit.map(Json).ok_or(AuditError::NotFound(guid))
}

/// Audit API errors
#[derive(Debug)]
pub enum AuditError {
    NotFound(String),
    DatabaseError(String),
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuditError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("Audit not found: {}", what))
            }
            AuditError::DatabaseError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {}", msg))
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
