//! Audit standards catalog
//!
//! Standards are the named check categories an audit runs against a project
//! (PHP compatibility, WordPress coding standards, lighthouse performance
//! checks). The platform default list can be overridden through the
//! `default_standards` settings row; the lighthouse check only applies to
//! themes, since it requires a rendered front end to score.

use crate::Result;
use sqlx::SqlitePool;

/// Settings key holding a JSON-array override of the default standards
pub const STANDARDS_SETTING_KEY: &str = "default_standards";

/// The lighthouse check identifier, only meaningful for themes
pub const LIGHTHOUSE: &str = "lighthouse";

/// Platform default standards, in execution order
pub const DEFAULT_STANDARDS: &[&str] = &["phpcs_wordpress", "phpcs_phpcompatibility", LIGHTHOUSE];

/// Load the default standards list, honoring a settings override
pub async fn default_standards(db: &SqlitePool) -> Result<Vec<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(STANDARDS_SETTING_KEY)
            .fetch_optional(db)
            .await?;

    if let Some((value,)) = row {
        if let Ok(standards) = serde_json::from_str::<Vec<String>>(&value) {
            return Ok(standards);
        }
        tracing::warn!(
            key = STANDARDS_SETTING_KEY,
            "Ignoring malformed standards override in settings"
        );
    }

    Ok(DEFAULT_STANDARDS.iter().map(|s| s.to_string()).collect())
}

/// Filter a standards list for a project type.
///
/// Removes the lighthouse check unless the project is a theme.
pub fn filter_standards(project_type: &str, standards: Vec<String>) -> Vec<String> {
    if project_type == "theme" {
        return standards;
    }

    standards.into_iter().filter(|s| s != LIGHTHOUSE).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        DEFAULT_STANDARDS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plugin_standards_exclude_lighthouse() {
        let standards = filter_standards("plugin", catalog());
        assert_eq!(standards, vec!["phpcs_wordpress", "phpcs_phpcompatibility"]);
    }

    #[test]
    fn theme_standards_retain_lighthouse() {
        let standards = filter_standards("theme", catalog());
        assert!(standards.contains(&LIGHTHOUSE.to_string()));
        assert_eq!(standards.len(), DEFAULT_STANDARDS.len());
    }

    #[tokio::test]
    async fn defaults_to_the_catalog_without_an_override() {
        let pool = crate::db::init::init_memory_database().await.unwrap();

        let standards = default_standards(&pool).await.unwrap();
        assert_eq!(standards, catalog());
    }

    #[tokio::test]
    async fn settings_override_is_honored() {
        let pool = crate::db::init::init_memory_database().await.unwrap();

        sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
            .bind(STANDARDS_SETTING_KEY)
            .bind(r#"["phpcs_wordpress"]"#)
            .execute(&pool)
            .await
            .unwrap();

        let standards = default_standards(&pool).await.unwrap();
        assert_eq!(standards, vec!["phpcs_wordpress".to_string()]);
    }

    #[tokio::test]
    async fn malformed_override_falls_back_to_the_catalog() {
        let pool = crate::db::init::init_memory_database().await.unwrap();

        sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
            .bind(STANDARDS_SETTING_KEY)
            .bind("not json")
            .execute(&pool)
            .await
            .unwrap();

        let standards = default_standards(&pool).await.unwrap();
        assert_eq!(standards, catalog());
    }

    #[test]
    fn filter_preserves_order() {
        let standards = filter_standards(
            "plugin",
            vec![
                "phpcs_phpcompatibility".to_string(),
                LIGHTHOUSE.to_string(),
                "phpcs_wordpress".to_string(),
            ],
        );
        assert_eq!(standards, vec!["phpcs_phpcompatibility", "phpcs_wordpress"]);
    }
}
