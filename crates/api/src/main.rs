//! Study backend server bootstrap.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gurt_api::build_router;
use gurt_api::state::AppState;
use gurt_config::AppConfig;
use gurt_storage::{LocalObjectStore, create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting study backend server...");

    let config = AppConfig::from_env()?;
    tracing::info!("Binding to {}", config.bind_address);

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let uploads_root = std::env::var("UPLOADS_LOCAL_DIR").unwrap_or_else(|_| "./data/uploads".to_string());
    let public_base_url = config
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", config.bind_address));
    let object_store = Arc::new(LocalObjectStore::new(uploads_root, public_base_url));

    let state = Arc::new(AppState::new(pool, config.clone(), object_store));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
