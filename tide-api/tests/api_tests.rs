//! Integration tests for tide-api endpoints
//!
//! Exercises the full router with an in-memory database and a stubbed
//! WordPress.org repository: health endpoint, API key authentication, the
//! alternate-id endpoint end to end (stub creation and re-dispatch), the
//! direct audit fetch and the capability toggle.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

use tide_api::wporg::dispatch::QueueController;
use tide_api::wporg::repo::RepoLookup;
use tide_api::wporg::WporgInterceptor;
use tide_api::{build_router, AppState};
use tide_common::api::auth::hash_api_key;
use tide_common::db::init::init_memory_database;
use tide_common::db::queries;

const API_KEY: &str = "test-api-key";

/// Repository stub with a fixed answer
struct StubRepo(bool);

#[async_trait]
impl RepoLookup for StubRepo {
    async fn exists_in_repo(&self, _project_type: &str, _slug: &str, _version: &str) -> bool {
        self.0
    }
}

/// Test helper: in-memory database with a wporg client account
async fn setup_db() -> SqlitePool {
    let pool = init_memory_database().await.unwrap();
    queries::create_user(&pool, "wporg", &hash_api_key(API_KEY), true)
        .await
        .unwrap();
    pool
}

/// Test helper: app with a stubbed repository lookup
fn setup_app(pool: &SqlitePool, exists_in_repo: bool) -> axum::Router {
    let wporg = Arc::new(WporgInterceptor::new(
        pool.clone(),
        Arc::new(StubRepo(exists_in_repo)),
        Arc::new(QueueController::new(pool.clone())),
        None,
    ));
    build_router(AppState::new(pool.clone(), wporg))
}

/// Test helper: authenticated GET request
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn queued_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_requests")
        .fetch_one(pool)
        .await
        .unwrap()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tide-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let request = Request::builder()
        .method("GET")
        .uri("/tide/v1/audit/wporg/plugin/akismet/4.1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_api_key_is_unauthorized() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let request = Request::builder()
        .method("GET")
        .uri("/tide/v1/audit/wporg/plugin/akismet/4.1")
        .header("x-api-key", "wrong-key")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Alternate-id endpoint
// =============================================================================

#[tokio::test]
async fn test_altid_without_client_param_is_not_found() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    // No project_client=wporg, so no interception happens
    let request = get_request("/tide/v1/audit/wporg/plugin/akismet/4.1");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(queued_count(&pool).await, 0);
}

#[tokio::test]
async fn test_altid_with_unknown_upstream_project_is_not_found() {
    let pool = setup_db().await;
    let app = setup_app(&pool, false);

    let request = get_request("/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(queued_count(&pool).await, 0);
}

#[tokio::test]
async fn test_altid_creates_stub_and_queues_first_run() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let request = get_request("/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["project_type"], "plugin");
    assert_eq!(
        body["source_url"],
        "https://downloads.wordpress.org/plugin/akismet.4.1.zip"
    );
    assert_eq!(body["source_type"], "zip");
    assert_eq!(body["visibility"], "public");
    assert_eq!(body["version"], "4.1");

    let (slug, force): (String, i64) =
        sqlx::query_as("SELECT slug, force FROM audit_requests")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(slug, "akismet");
    assert_eq!(force, 0);
}

#[tokio::test]
async fn test_altid_redispatches_existing_audit() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    // First request materializes the stub
    let response = app
        .clone()
        .oneshot(get_request(
            "/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queued_count(&pool).await, 1);

    // Second request finds it and re-dispatches, forced this time
    let response = app
        .oneshot(get_request(
            "/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let forces: Vec<(i64,)> =
        sqlx::query_as("SELECT force FROM audit_requests ORDER BY force")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(forces, vec![(0,), (1,)]);
}

#[tokio::test]
async fn test_get_audit_by_guid() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let response = app
        .clone()
        .oneshot(get_request(
            "/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let guid = body["guid"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/tide/v1/audit/{}", guid)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["guid"], guid.as_str());

    let response = app
        .oneshot(get_request("/tide/v1/audit/no-such-guid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Capability toggle
// =============================================================================

fn put_capabilities(login: &str, value: bool) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/tide/v1/users/{}/capabilities", login))
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "alter_dot_org_project": value })).unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_capability_toggle_gates_redispatch() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    // Materialize the stub first
    let response = app
        .clone()
        .oneshot(get_request(
            "/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queued_count(&pool).await, 1);

    // Revoke the capability
    let response = app.clone().oneshot(put_capabilities("wporg", false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["alter_dot_org_project"], false);

    // Existing audit no longer re-dispatches
    let response = app
        .oneshot(get_request(
            "/tide/v1/audit/wporg/plugin/akismet/4.1?project_client=wporg",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queued_count(&pool).await, 1);
}

#[tokio::test]
async fn test_capability_toggle_unknown_user() {
    let pool = setup_db().await;
    let app = setup_app(&pool, true);

    let response = app.oneshot(put_capabilities("nobody", true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
