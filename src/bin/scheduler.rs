//! `newsagent-scheduler` — the Discovery Scheduler binary (C6).
//!
//! Runs the periodic tick loop as a background task alongside the
//! scheduler's own HTTP surface (source/article admin CRUD, the inbound
//! webhook relay).

use std::sync::Arc;

use tokio::sync::Mutex;

use newsagent::config::AppConfig;
use newsagent::notifier::ErrorNotifier;
use newsagent::scheduler::{self, SchedulerState};
use newsagent::store::Store;
use newsagent::{BrowserPool, BrowserPoolConfig, GovernanceGatekeeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let store = Store::connect(&config.database_url).await?;

    let governance = Arc::new(Mutex::new(
        GovernanceGatekeeper::connect(
            &config.redis_url,
            store.clone(),
            config.user_agent.clone(),
            config.default_delay_seconds(),
        )
        .await?,
    ));

    let browser_pool = BrowserPool::new(BrowserPoolConfig::new(config.browser_ws_endpoint.clone()));
    browser_pool.start().await?;

    let notifier = Arc::new(ErrorNotifier::new(
        store.clone(),
        &config.smtp_server,
        config.smtp_port,
        &config.smtp_email,
        &config.smtp_password,
    )?);

    tokio::spawn(scheduler::run_tick_loop(
        store.clone(),
        Arc::clone(&governance),
        Arc::clone(&browser_pool),
        Arc::clone(&notifier),
        config.submission_source_id.clone(),
        config.main_api_url.clone(),
        config.newsagent_api_key.clone(),
        config.scheduler_concurrency(),
    ));

    let state = SchedulerState {
        store,
        webhook_secret: config.webhook_secret.clone(),
    };
    let app = scheduler::router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8001").await?;
    tracing::info!("newsagent-scheduler listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
