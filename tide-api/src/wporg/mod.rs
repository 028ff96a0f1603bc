//! WordPress.org interception core
//!
//! Audit lookups arrive addressed by project identity (type + slug +
//! version). For requests originating from the WordPress.org client this
//! module wraps the lookup outcome: an existing audit gets re-dispatched to
//! the audit queue (and its cached page invalidated), a missing one is
//! materialized as a stub record after verifying the project really exists
//! in the WordPress.org repository, then dispatched for its first run.
//!
//! Every guard failure resolves to the unchanged input outcome; nothing in
//! this path is fatal to the host request.

use axum::http::Method;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use tide_common::db::models::{Audit, AuditRequest, User};
use tide_common::db::queries::{self, NewAudit};
use tide_common::standards::{self, DEFAULT_STANDARDS};
use tide_common::LookupError;

use crate::wporg::cache::PageCache;
use crate::wporg::dispatch::AuditPostsController;
use crate::wporg::repo::RepoLookup;

pub mod cache;
pub mod dispatch;
pub mod repo;

/// Client tag identifying WordPress.org-originated requests
pub const WPORG_CLIENT: &str = "wporg";

/// Source type of synthesized download archives
pub const SOURCE_TYPE_ZIP: &str = "zip";

/// Visibility of stub audits
pub const VISIBILITY_PUBLIC: &str = "public";

/// Outcome of an alternate-id audit lookup
pub type LookupOutcome = Result<Audit, LookupError>;

/// Read-only view of the inbound REST request, as the interception core
/// sees it: method, route and a flat parameter bag merging path and query
/// parameters.
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: Method,
    route: String,
    params: HashMap<String, String>,
}

impl RestRequest {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            params: HashMap::new(),
        }
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.params.insert(name.to_string(), value.into());
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Per-request interception context.
///
/// `handled` stops a dispatched sub-request from re-entering the
/// interceptor and recursing; it lives here, scoped to one request's call
/// chain, rather than in process-global state.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub handled: bool,
    pub current_user: Option<User>,
}

impl RequestContext {
    pub fn for_user(user: User) -> Self {
        Self {
            handled: false,
            current_user: Some(user),
        }
    }
}

/// The interception core and its collaborators
pub struct WporgInterceptor {
    db: SqlitePool,
    repo: Arc<dyn RepoLookup>,
    controller: Arc<dyn AuditPostsController>,
    page_cache: Option<Arc<dyn PageCache>>,
}

impl WporgInterceptor {
    pub fn new(
        db: SqlitePool,
        repo: Arc<dyn RepoLookup>,
        controller: Arc<dyn AuditPostsController>,
        page_cache: Option<Arc<dyn PageCache>>,
    ) -> Self {
        Self {
            db,
            repo,
            controller,
            page_cache,
        }
    }

    /// Decide whether WordPress.org handling applies to a lookup outcome,
    /// and if so delegate to the matching branch handler; otherwise return
    /// the input unchanged.
    ///
    /// Guards, in order, each short-circuiting to "unchanged":
    /// re-entrancy flag unset; read method; `project_client` is wporg;
    /// project type, slug and version params present; a wporg user account
    /// exists.
    pub async fn intercept(
        &self,
        outcome: LookupOutcome,
        request: &RestRequest,
        ctx: &mut RequestContext,
    ) -> LookupOutcome {
        if ctx.handled {
            return outcome;
        }

        if !matches!(*request.method(), Method::GET | Method::HEAD) {
            return outcome;
        }

        if request.param("project_client") != Some(WPORG_CLIENT) {
            return outcome;
        }

        if request.param("project_type").is_none()
            || request.param("project_slug").is_none()
            || request.param("version").is_none()
        {
            return outcome;
        }

        let user = match queries::find_user_by_login(&self.db, WPORG_CLIENT).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("No {} user account, skipping interception", WPORG_CLIENT);
                return outcome;
            }
            Err(e) => {
                error!("User lookup failed during interception: {}", e);
                return outcome;
            }
        };

        match outcome {
            Ok(audit) => self.handle_existing_audit(audit, request, ctx).await,
            Err(err) => self.handle_non_existing_audit(err, request, ctx, user.id).await,
        }
    }

    /// Re-trigger the audit for a record that already exists.
    ///
    /// Only the record's author, holding the alter_dot_org_project
    /// capability, may re-trigger; anyone else gets the record back
    /// unchanged with no side effects.
    async fn handle_existing_audit(
        &self,
        audit: Audit,
        request: &RestRequest,
        ctx: &mut RequestContext,
    ) -> LookupOutcome {
        let authorized = ctx
            .current_user
            .as_ref()
            .map(|user| user.id == audit.author_id && user.can_alter_dot_org_project)
            .unwrap_or(false);
        if !authorized {
            return Ok(audit);
        }

        // Cannot safely re-dispatch without the project identity
        let slug = match queries::audit_project_slug(&self.db, &audit.guid).await {
            Ok(Some(slug)) => slug,
            Ok(None) => return Ok(audit),
            Err(e) => {
                error!(audit = %audit.guid, "Project slug lookup failed: {}", e);
                return Ok(audit);
            }
        };

        let new_request = AuditRequest {
            title: audit.title.clone(),
            content: audit.content.clone(),
            source_url: audit.source_url.clone(),
            source_type: audit.source_type.clone(),
            project_type: audit.project_type.clone(),
            slug: slug.clone(),
            visibility: audit.visibility.clone(),
            force: true,
            standards: audit.standards.clone(),
            request_client: WPORG_CLIENT.to_string(),
        };

        ctx.handled = true;
        self.dispatch_new_request(&new_request, &audit).await;

        if let Some(cache) = &self.page_cache {
            let version = request.param("version").unwrap_or(&audit.version);
            let url = format!(
                "tide/v1/audit/wporg/{}/{}/{}",
                audit.project_type, slug, version
            );
            debug!(url = %url, "Invalidating page cache entry");
            cache.clear_url(&url);
        }

        Ok(audit)
    }

    /// Materialize a stub audit for a project with no record yet, and kick
    /// off its first audit run.
    ///
    /// Applies only to the invalid-altid lookup failure, and only when the
    /// project actually exists in the WordPress.org repository; anything
    /// else passes the original error through, so spoofed or typo'd
    /// requests never pollute the database with stubs.
    async fn handle_non_existing_audit(
        &self,
        err: LookupError,
        request: &RestRequest,
        ctx: &mut RequestContext,
        user_id: i64,
    ) -> LookupOutcome {
        if err != LookupError::InvalidAltidLookup {
            return Err(err);
        }

        // Presence guarded by the interceptor
        let project_type = request.param("project_type").unwrap_or_default();
        let slug = request.param("project_slug").unwrap_or_default();
        let version = request.param("version").unwrap_or_default();

        if !self.repo.exists_in_repo(project_type, slug, version).await {
            debug!(
                project_type = %project_type,
                slug = %slug,
                version = %version,
                "Project not found in the WordPress.org repository"
            );
            return Err(err);
        }

        let standards = match standards::default_standards(&self.db).await {
            Ok(list) => list,
            Err(e) => {
                error!("Failed to load default standards: {}", e);
                DEFAULT_STANDARDS.iter().map(|s| s.to_string()).collect()
            }
        };
        let standards = standards::filter_standards(project_type, standards);

        let source_url = format!(
            "https://downloads.wordpress.org/{}/{}.{}.zip",
            project_type, slug, version
        );

        let audit = match queries::create_audit(
            &self.db,
            NewAudit {
                title: slug.to_string(),
                content: String::new(),
                status: "publish".to_string(),
                author_id: user_id,
                project_type: project_type.to_string(),
                source_url: source_url.clone(),
                source_type: SOURCE_TYPE_ZIP.to_string(),
                standards: standards.clone(),
                version: version.to_string(),
                visibility: VISIBILITY_PUBLIC.to_string(),
            },
            slug,
        )
        .await
        {
            Ok(audit) => audit,
            Err(e) => {
                error!(slug = %slug, "Failed to create stub audit: {}", e);
                return Err(err);
            }
        };

        info!(
            audit = %audit.guid,
            project_type = %project_type,
            slug = %slug,
            version = %version,
            "Created stub audit for WordPress.org project"
        );

        let new_request = AuditRequest {
            title: audit.title.clone(),
            content: audit.content.clone(),
            source_url,
            source_type: SOURCE_TYPE_ZIP.to_string(),
            project_type: project_type.to_string(),
            slug: slug.to_string(),
            visibility: VISIBILITY_PUBLIC.to_string(),
            force: false,
            standards,
            request_client: WPORG_CLIENT.to_string(),
        };

        ctx.handled = true;
        self.dispatch_new_request(&new_request, &audit).await;

        Ok(audit)
    }

    /// Hand a built audit request to the audit-posts controller boundary.
    /// No decision logic here; dispatch failures are logged, never raised.
    async fn dispatch_new_request(&self, request: &AuditRequest, audit: &Audit) {
        if let Err(e) = self
            .controller
            .create_audit_request(request, audit, &request.standards)
            .await
        {
            error!(audit = %audit.guid, "Audit request dispatch failed: {}", e);
        }
    }
}
