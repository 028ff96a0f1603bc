//! tide-api library - Tide audit REST service
//!
//! Serves audit records looked up by project identity and carries the
//! WordPress.org interception behavior: stub creation for projects that
//! exist upstream and audit re-dispatch for records that already do.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::wporg::WporgInterceptor;

pub mod api;
pub mod wporg;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// WordPress.org interception core
    pub wporg: Arc<WporgInterceptor>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, wporg: Arc<WporgInterceptor>) -> Self {
        Self { db, wporg }
    }
}

/// Build application router
///
/// Health endpoint is public; everything else requires an API key.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, put};
    use tower_http::trace::TraceLayer;

    // Protected routes (require authentication)
    let protected = Router::new()
        .route(
            "/tide/v1/audit/wporg/:project_type/:project_slug/:version",
            get(api::audit::get_audit_by_altid),
        )
        .route("/tide/v1/audit/:guid", get(api::audit::get_audit_by_guid))
        .route(
            "/tide/v1/users/:login/capabilities",
            put(api::users::set_capabilities),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new().merge(api::health::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
