mod applications;
mod auth;
mod candidates;
mod clients;
mod config;
mod dashboard;
mod db;
mod errors;
mod interviews;
mod models;
mod pagination;
mod pipeline;
mod requirements;
mod routes;
mod state;
mod storage;
mod users;
mod validation;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::denylist::{MemoryDenylist, RedisDenylist, TokenDenylist};
use crate::auth::token::TokenService;
use crate::config::{Config, ResumeStoreConfig};
use crate::db::{create_pool, run_migrations};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{LocalResumeStore, ResumeStore, S3ResumeStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HireOps API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and bring the schema up to date
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    if let Some(admin) = &config.admin_bootstrap {
        users::queries::bootstrap_admin(&db, admin).await?;
    }

    // Token denylist: Redis when configured, process memory otherwise
    let denylist: Arc<dyn TokenDenylist> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            info!("Redis token denylist initialized");
            Arc::new(RedisDenylist::new(client))
        }
        None => {
            info!("REDIS_URL not set; using in-memory token denylist");
            Arc::new(MemoryDenylist::default())
        }
    };

    // Resume storage
    let resumes: Arc<dyn ResumeStore> = match &config.resume_store {
        ResumeStoreConfig::Local { upload_dir } => {
            info!("Storing resumes under {upload_dir}");
            Arc::new(LocalResumeStore::new(upload_dir))
        }
        ResumeStoreConfig::S3 {
            bucket,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let store =
                S3ResumeStore::connect(endpoint, bucket, access_key_id, secret_access_key).await;
            info!("S3 resume store initialized (bucket: {bucket})");
            Arc::new(store)
        }
    };

    let tokens = TokenService::new(&config.jwt_secret, config.access_token_expire_minutes);

    // Build app state
    let state = AppState {
        db,
        tokens,
        denylist,
        resumes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
