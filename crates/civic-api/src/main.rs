//! # civic-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the civic services API.
//! Binds to the configured port (default 8080).

use std::sync::Arc;

use civic_api::blob::{BlobStore, MemoryBlobStore};
use civic_api::config::AppConfig;
use civic_api::db::{self, PgBlobStore, PgStore};
use civic_api::seed::{ensure_seeded, load_catalog};
use civic_api::state::AppState;
use civic_api::store::{CivicStore, MemoryStore};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    if let Some(addr) = config.metrics_addr {
        civic_api::middleware::metrics::install_prometheus(addr)?;
    }

    // Storage backends: PostgreSQL when configured, in-memory otherwise.
    let (store, blobs): (Arc<dyn CivicStore>, Arc<dyn BlobStore>) = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url).await.map_err(|e| {
                tracing::error!("Database initialization failed: {e}");
                e
            })?;
            (
                Arc::new(PgStore::new(pool.clone())),
                Arc::new(PgBlobStore::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data is lost on restart");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()))
        }
    };

    let catalog = load_catalog(config.catalog_path.as_deref())?;
    let report = ensure_seeded(store.as_ref(), &catalog).await.map_err(|e| {
        tracing::error!("Catalog seeding failed: {e}");
        e
    })?;
    tracing::info!(%report, "document types ready");

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; authentication is disabled");
    }

    let port = config.port;
    let app = civic_api::app(AppState::new(config, store, blobs));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Civic services API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
