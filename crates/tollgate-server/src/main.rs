mod config;
mod error;
mod routes;
mod state;

use chrono::Duration;
use config::StorageBackend;
use state::AppState;
use std::sync::Arc;
use tollgate_engine::TokenEngine;
use tollgate_store::{MemoryDirectory, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cfg = config::load_config()?;

    let engine = match cfg.storage.backend {
        StorageBackend::Postgres => {
            let url = cfg.storage.effective_database_url();
            if url.is_empty() {
                anyhow::bail!(
                    "storage.backend = \"postgres\" requires storage.database_url or TOLLGATE_DATABASE_URL"
                );
            }
            // A store that cannot be reached at startup is fatal: serving
            // requests against a dead connection is worse than not starting.
            let store = Arc::new(PgStore::connect(&url).await?);
            store.ensure_schema().await?;
            TokenEngine::new(store.clone(), store)
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; tokens will not survive a restart");
            TokenEngine::new(Arc::new(MemoryStore::new()), Arc::new(MemoryDirectory::new()))
        }
    }
    .with_validity(Duration::days(cfg.tokens.validity_days));

    let app = routes::router(AppState::new(Arc::new(engine)));

    tracing::info!("tollgate-server listening on {}", cfg.server.bind);
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
