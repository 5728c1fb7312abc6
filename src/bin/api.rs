//! `newsagent-api` — the Job API binary (C7).

use newsagent::api::{self, ApiState};
use newsagent::config::AppConfig;
use newsagent::queue::WorkQueue;
use newsagent::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let store = Store::connect(&config.database_url).await?;
    let queue = WorkQueue::connect(&config.redis_url, &config.redis_queue_name, &config.redis_dlq_name).await?;

    let state = ApiState {
        queue,
        store,
        api_key: config.newsagent_api_key.clone(),
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
    tracing::info!("newsagent-api listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
