//! Queries over the audit schema

use crate::db::models::{Audit, User};
use crate::{LookupError, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

type AuditRow = (
    String, // guid
    String, // title
    String, // content
    String, // status
    i64,    // author_id
    String, // project_type
    String, // source_url
    String, // source_type
    String, // standards (JSON)
    String, // version
    String, // visibility
    String, // created_at
);

const AUDIT_COLUMNS: &str = "guid, title, content, status, author_id, project_type, \
     source_url, source_type, standards, version, visibility, created_at";

fn audit_from_row(row: AuditRow) -> Audit {
    Audit {
        guid: row.0,
        title: row.1,
        content: row.2,
        status: row.3,
        author_id: row.4,
        project_type: row.5,
        source_url: row.6,
        source_type: row.7,
        standards: serde_json::from_str(&row.8).unwrap_or_default(),
        version: row.9,
        visibility: row.10,
        created_at: row.11,
    }
}

/// Locate an audit by project identity (alternate-id lookup).
///
/// Returns [`LookupError::InvalidAltidLookup`] when no record matches, so
/// callers can distinguish "no such audit" from a database failure.
pub async fn find_audit_by_altid(
    db: &SqlitePool,
    project_type: &str,
    project_slug: &str,
    version: &str,
) -> std::result::Result<Audit, LookupError> {
    let sql = format!(
        "SELECT a.{} FROM audits a
         JOIN audit_projects ap ON ap.audit_guid = a.guid
         JOIN projects p ON p.id = ap.project_id
         WHERE p.slug = ? AND a.project_type = ? AND a.version = ?",
        AUDIT_COLUMNS.replace(", ", ", a.")
    );

    let row: Option<AuditRow> = sqlx::query_as(&sql)
        .bind(project_slug)
        .bind(project_type)
        .bind(version)
        .fetch_optional(db)
        .await
        .map_err(|e| LookupError::Db(e.to_string()))?;

    row.map(audit_from_row).ok_or(LookupError::InvalidAltidLookup)
}

/// Fetch an audit by guid
pub async fn get_audit(db: &SqlitePool, guid: &str) -> Result<Option<Audit>> {
    let sql = format!("SELECT {} FROM audits WHERE guid = ?", AUDIT_COLUMNS);
    let row: Option<AuditRow> = sqlx::query_as(&sql).bind(guid).fetch_optional(db).await?;
    Ok(row.map(audit_from_row))
}

/// Parameters for a stub audit record
#[derive(Debug, Clone)]
pub struct NewAudit {
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
}

/// Create an audit record and link it to a project slug
pub async fn create_audit(db: &SqlitePool, new: NewAudit, project_slug: &str) -> Result<Audit> {
    let guid = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    let standards_json = serde_json::to_string(&new.standards)
        .map_err(|e| crate::Error::Internal(e.to_string()))?;

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO audits (guid, title, content, status, author_id, project_type,
            source_url, source_type, standards, version, visibility, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(&new.title)
    .bind(&new.content)
    .bind(&new.status)
    .bind(new.author_id)
    .bind(&new.project_type)
    .bind(&new.source_url)
    .bind(&new.source_type)
    .bind(&standards_json)
    .bind(&new.version)
    .bind(&new.visibility)
    .bind(&created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO projects (slug) VALUES (?)")
        .bind(project_slug)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO audit_projects (audit_guid, project_id)
         SELECT ?, id FROM projects WHERE slug = ?",
    )
    .bind(&guid)
    .bind(project_slug)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Audit {
        guid,
        title: new.title,
        content: new.content,
        status: new.status,
        author_id: new.author_id,
        project_type: new.project_type,
        source_url: new.source_url,
        source_type: new.source_type,
        standards: new.standards,
        version: new.version,
        visibility: new.visibility,
        created_at,
    })
}

/// Resolve the project slug an audit is linked to, if any
pub async fn audit_project_slug(db: &SqlitePool, audit_guid: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT p.slug FROM projects p
         JOIN audit_projects ap ON ap.project_id = p.id
         WHERE ap.audit_guid = ?",
    )
    .bind(audit_guid)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(slug,)| slug))
}

type UserRow = (i64, String, String, i64);

fn user_from_row(row: UserRow) -> User {
    User {
        id: row.0,
        login: row.1,
        api_key_hash: row.2,
        can_alter_dot_org_project: row.3 != 0,
    }
}

/// Find a user by login name
pub async fn find_user_by_login(db: &SqlitePool, login: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, login, api_key_hash, can_alter_dot_org_project FROM users WHERE login = ?",
    )
    .bind(login)
    .fetch_optional(db)
    .await?;
    Ok(row.map(user_from_row))
}

/// Find a user by API key hash
pub async fn find_user_by_api_key_hash(db: &SqlitePool, hash: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, login, api_key_hash, can_alter_dot_org_project FROM users WHERE api_key_hash = ?",
    )
    .bind(hash)
    .fetch_optional(db)
    .await?;
    Ok(row.map(user_from_row))
}

/// Create a user account with a pre-hashed API key
pub async fn create_user(
    db: &SqlitePool,
    login: &str,
    api_key_hash: &str,
    can_alter_dot_org_project: bool,
) -> Result<User> {
    let result = sqlx::query(
        "INSERT INTO users (login, api_key_hash, can_alter_dot_org_project) VALUES (?, ?, ?)",
    )
    .bind(login)
    .bind(api_key_hash)
    .bind(can_alter_dot_org_project as i64)
    .execute(db)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        login: login.to_string(),
        api_key_hash: api_key_hash.to_string(),
        can_alter_dot_org_project,
    })
}

/// Toggle the alter_dot_org_project capability for a user.
///
/// Returns false when no such user exists.
pub async fn set_user_capability(
    db: &SqlitePool,
    login: &str,
    can_alter_dot_org_project: bool,
) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET can_alter_dot_org_project = ? WHERE login = ?")
        .bind(can_alter_dot_org_project as i64)
        .bind(login)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
