//! Audit request dispatch boundary
//!
//! The interception core marshals audit parameters into an
//! [`AuditRequest`] and hands it here. The production controller persists
//! the request into the `audit_requests` queue table, where the (separate)
//! audit execution pipeline picks it up.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use tide_common::db::models::{Audit, AuditRequest};

/// Controller receiving fully built audit requests
#[async_trait]
pub trait AuditPostsController: Send + Sync {
    /// Persist/queue a new audit request targeting `audit`
    async fn create_audit_request(
        &self,
        request: &AuditRequest,
        audit: &Audit,
        standards: &[String],
    ) -> anyhow::Result<()>;
}

/// Queue-backed controller writing to the audit_requests table
pub struct QueueController {
    db: SqlitePool,
}

impl QueueController {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditPostsController for QueueController {
    async fn create_audit_request(
        &self,
        request: &AuditRequest,
        audit: &Audit,
        standards: &[String],
    ) -> anyhow::Result<()> {
        let guid = Uuid::new_v4().to_string();
        let standards_json = serde_json::to_string(standards)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO audit_requests (guid, audit_guid, title, content, source_url,
                source_type, project_type, slug, visibility, force, standards,
                request_client, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&guid)
        .bind(&audit.guid)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.source_url)
        .bind(&request.source_type)
        .bind(&request.project_type)
        .bind(&request.slug)
        .bind(&request.visibility)
        .bind(request.force as i64)
        .bind(&standards_json)
        .bind(&request.request_client)
        .bind(&created_at)
        .execute(&self.db)
        .await?;

        info!(
            request = %guid,
            audit = %audit.guid,
            slug = %request.slug,
            force = request.force,
            "Queued audit request"
        );

        Ok(())
    }
}
