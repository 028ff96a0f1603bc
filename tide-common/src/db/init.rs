//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently,
//! so every service binary can start against an empty root folder.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema, for tests
pub async fn init_memory_database() -> Result<SqlitePool> {
    // A single never-recycled connection: the database lives and dies
    // with it.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all tables (idempotent, safe to call multiple times)
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_audits_table(pool).await?;
    create_projects_tables(pool).await?;
    create_audit_requests_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    // API client accounts. can_alter_dot_org_project is the capability
    // gating re-dispatch of WordPress.org-hosted audits.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            api_key_hash TEXT NOT NULL,
            can_alter_dot_org_project INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_audits_table(pool: &SqlitePool) -> Result<()> {
    // standards is a JSON array of check identifiers
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS audits (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'publish',
            author_id INTEGER NOT NULL,
            project_type TEXT NOT NULL,
            source_url TEXT NOT NULL,
            source_type TEXT NOT NULL,
            standards TEXT NOT NULL,
            version TEXT NOT NULL,
            visibility TEXT NOT NULL DEFAULT 'public',
            created_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_projects_tables(pool: &SqlitePool) -> Result<()> {
    // projects plays the role of a taxonomy: audits are linked to a project
    // slug through audit_projects rather than carrying the slug themselves.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS audit_projects (
            audit_guid TEXT NOT NULL,
            project_id INTEGER NOT NULL,
            PRIMARY KEY (audit_guid, project_id),
            FOREIGN KEY (audit_guid) REFERENCES audits(guid),
            FOREIGN KEY (project_id) REFERENCES projects(id)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_audit_requests_table(pool: &SqlitePool) -> Result<()> {
    // Dispatch queue consumed by the audit execution pipeline
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS audit_requests (
            guid TEXT PRIMARY KEY,
            audit_guid TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            source_url TEXT NOT NULL,
            source_type TEXT NOT NULL,
            project_type TEXT NOT NULL,
            slug TEXT NOT NULL,
            visibility TEXT NOT NULL,
            force INTEGER NOT NULL,
            standards TEXT NOT NULL,
            request_client TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            FOREIGN KEY (audit_guid) REFERENCES audits(guid)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}
