//! Database models

use serde::{Deserialize, Serialize};

/// API client account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// SHA-256 hex digest of the client's API key
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    /// Capability gating re-dispatch of WordPress.org-hosted audits
    pub can_alter_dot_org_project: bool,
}

/// Audit record, located either by guid or by project identity
/// (project type + slug + version)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub guid: String,
    pub title: String,
    pub content: String,
    pub status: String,
    pub author_id: i64,
    pub project_type: String,
    pub source_url: String,
    pub source_type: String,
    pub standards: Vec<String>,
    pub version: String,
    pub visibility: String,
    pub created_at: String,
}

/// Outbound audit request, built fresh per dispatch and handed to the
/// audit-request controller boundary. Never persisted directly; the
/// controller owns its own records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub title: String,
    pub content: String,
    pub source_url: String,
    pub source_type: String,
    pub project_type: String,
    pub slug: String,
    pub visibility: String,
    pub force: bool,
    pub standards: Vec<String>,
    pub request_client: String,
}

/// Service setting row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}
