//! WordPress.org repository information client
//!
//! Answers one question: does a given plugin/theme have a published version
//! matching the requested one, per the public WordPress.org information
//! service. Every failure mode (transport, empty body, parse error, missing
//! field) resolves to "does not exist" so callers always have a definite
//! boolean to branch on.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const WPORG_API_BASE_URL: &str = "https://api.wordpress.org";
const USER_AGENT: &str = "TideAPI/0.1.0 (https://wptide.org)";

/// Repository existence lookup, behind a trait so tests can stub it
#[async_trait]
pub trait RepoLookup: Send + Sync {
    /// Whether project type/slug has a published version matching `version`
    async fn exists_in_repo(&self, project_type: &str, slug: &str, version: &str) -> bool;
}

/// Client for the WordPress.org plugin/theme information API
pub struct WporgRepoClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl WporgRepoClient {
    pub fn new() -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: WPORG_API_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Type-specific info endpoint, requesting only the versions field
    fn info_url(&self, project_type: &str, slug: &str) -> String {
        format!(
            "{}/{}s/info/1.1/?action={}_information&request[slug]={}\
             &request[fields][versions]=1&request[fields][description]=0",
            self.base_url, project_type, project_type, slug
        )
    }
}

/// Whether an info-API response body lists the requested version.
///
/// Pure JSON inspection: body must parse and carry a `versions` object
/// containing the version as a key.
pub fn body_has_version(body: &str, version: &str) -> bool {
    if body.is_empty() {
        return false;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };

    value
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|versions| versions.contains_key(version))
        .unwrap_or(false)
}

#[async_trait]
impl RepoLookup for WporgRepoClient {
    async fn exists_in_repo(&self, project_type: &str, slug: &str, version: &str) -> bool {
        let url = self.info_url(project_type, slug);
        debug!(url = %url, "Querying WordPress.org information API");

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(slug = %slug, "Repository query failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!(slug = %slug, status = %response.status(), "Repository query rejected");
            return false;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(slug = %slug, "Failed to read repository response: {}", e);
                return false;
            }
        };

        body_has_version(&body, version)
    }
}
