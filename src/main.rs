use std::sync::Arc;

use decision_maker::{
    config::Config,
    db::{create_redis_client, redis::RedisCache, FileStore, KeyValueStore},
    routes::{create_router, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decision_maker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);

    // Without Redis the response caches stay in-process
    let (redis, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let (cache, writer) = RedisCache::new(create_redis_client(url)?);
            tracing::info!("Response cache backed by Redis");
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, caching responses locally");
            (None, None)
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, store, redis)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
