use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flowcycles_backend::config::{AppConfig, StorageBackend};
use flowcycles_backend::routes::{self, AppState};
use flowcycles_backend::storage::{MemStorage, PgStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;

    let store: Arc<dyn Storage> = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("🧪 Using in-memory storage, data is lost on restart");
            Arc::new(MemStorage::new())
        }
        StorageBackend::Postgres => {
            let store = PgStorage::connect(&config.database).await?;
            tracing::info!("🐘 Connected to PostgreSQL");
            Arc::new(store)
        }
    };

    let app = routes::app(AppState::new(store));

    tracing::info!("🧠 Server running at {}", config.bind_addr);
    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
