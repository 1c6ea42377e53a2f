//! Itemshelf Server
//!
//! REST backend for the item catalog - PostgreSQL holds the data, Redis
//! fronts it as a read-through cache with TTL.

mod config;
mod error;
mod handlers;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::Config;
use services::ItemService;
use storage::{CacheStore, Database, NullCache, RedisCache};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<ItemService>,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Itemshelf Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, cache_ttl={}s",
        config.bind_address,
        config.cache_ttl.as_secs()
    );

    // Initialize PostgreSQL; the API cannot serve without it
    let db = Arc::new(
        Database::connect(&config.database_url)
            .await
            .context("Failed to initialize database")?,
    );

    // Initialize Redis; degrade to uncached persistence when unreachable
    let cache: Arc<dyn CacheStore> = match RedisCache::connect(&config.redis_url).await {
        Ok(cache) => {
            info!("Redis cache ready");
            Arc::new(cache)
        }
        Err(e) => {
            warn!("Redis unavailable, serving without cache: {:#}", e);
            Arc::new(NullCache)
        }
    };

    // Initialize services
    let items = Arc::new(ItemService::new(db, cache, config.cache_ttl));

    let state = AppState { items };

    // Build router
    info!("Building HTTP router...");
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // REST API routes
        .merge(api_routes())
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    // Both spellings route the same way; there is no trailing-slash
    // redirect to lean on
    Router::new()
        .route(
            "/items",
            get(handlers::items::list).post(handlers::items::create),
        )
        .route(
            "/items/",
            get(handlers::items::list).post(handlers::items::create),
        )
        .route(
            "/items/:id",
            get(handlers::items::get)
                .put(handlers::items::update)
                .delete(handlers::items::delete),
        )
}
