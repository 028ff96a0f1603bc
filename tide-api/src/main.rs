//! tide-api - Tide audit REST service
//!
//! Serves audit records by project identity and carries the WordPress.org
//! interception behavior (stub creation, audit re-dispatch, page cache
//! invalidation).

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use tide_api::wporg::cache::MemoryPageCache;
use tide_api::wporg::dispatch::QueueController;
use tide_api::wporg::repo::WporgRepoClient;
use tide_api::wporg::WporgInterceptor;
use tide_api::{build_router, AppState};
use tide_common::api::auth::{generate_api_key, hash_api_key};
use tide_common::db::init::init_database;
use tide_common::db::queries;

const LISTEN_ADDR: &str = "127.0.0.1:8123";

#[derive(Debug, Parser)]
#[command(name = "tide-api", about = "Tide audit REST service")]
struct Args {
    /// Root folder holding the tide database
    #[arg(long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Tide API (tide-api) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let root_folder =
        tide_common::config::resolve_root_folder(args.root_folder.as_deref(), "TIDE_ROOT")?;
    std::fs::create_dir_all(&root_folder)?;

    let db_path = tide_common::config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    // First-run bootstrap: the interception path requires a wporg client
    // account. The generated key is logged once; only its hash is stored.
    if queries::find_user_by_login(&pool, "wporg").await?.is_none() {
        let api_key = generate_api_key();
        queries::create_user(&pool, "wporg", &hash_api_key(&api_key), true).await?;
        info!("Created wporg client account, API key: {}", api_key);
    }

    let repo = Arc::new(WporgRepoClient::new()?);
    let controller = Arc::new(QueueController::new(pool.clone()));
    let page_cache = Arc::new(MemoryPageCache::new());

    let wporg = Arc::new(WporgInterceptor::new(
        pool.clone(),
        repo,
        controller,
        Some(page_cache),
    ));

    let state = AppState::new(pool, wporg);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    info!("tide-api listening on http://{}", LISTEN_ADDR);
    info!("Health check: http://{}/health", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
