use std::sync::Arc;

use proms_server::bootstrap::Bootstrap;
use proms_server::config::AppConfig;
use proms_server::search::{reindex_all, SearchIndex};
use proms_server::{app, db, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config).await?;

    if config.bootstrap {
        let summary = Bootstrap::new(pool.clone(), config.seed_dir.clone()).run().await;
        tracing::info!("Bootstrap finished: {:?}", summary);
    }

    let search = Arc::new(SearchIndex::new());
    reindex_all(&pool, &search).await?;

    let state = Arc::new(AppState::new(pool, search));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("PROMS server running on http://{}", config.bind_addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
