//! `newsagent-worker` — the job processing loop that drives the Pipeline
//! Executor (C5) against jobs popped off the work queue (C4).

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use newsagent::config::AppConfig;
use newsagent::models::JobStatus;
use newsagent::notifier::ErrorNotifier;
use newsagent::pipeline::llm::HttpLlmClient;
use newsagent::pipeline::search::HttpSearchClient;
use newsagent::pipeline::Executor;
use newsagent::queue::WorkQueue;
use newsagent::store::Store;
use newsagent::{BrowserPool, BrowserPoolConfig, GovernanceGatekeeper};

const DEQUEUE_TIMEOUT_SECS: f64 = 5.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let store = Store::connect(&config.database_url).await?;
    let mut queue = WorkQueue::connect(&config.redis_url, &config.redis_queue_name, &config.redis_dlq_name).await?;

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

    let http_client = reqwest::Client::new();
    let llm = Arc::new(HttpLlmClient::new(
        http_client.clone(),
        config.llm_api_base.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    ));
    let search = Arc::new(HttpSearchClient::new(http_client.clone(), config.search_api_key.clone()));

    let notifier = ErrorNotifier::new(
        store.clone(),
        &config.smtp_server,
        config.smtp_port,
        &config.smtp_email,
        &config.smtp_password,
    )?;

    let executor = Executor::new(&config, store, governance, browser_pool, llm, search);

    info!("newsagent-worker started, polling queue every {DEQUEUE_TIMEOUT_SECS}s");
    loop {
        let job = match queue.dequeue_blocking(DEQUEUE_TIMEOUT_SECS).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!("worker: dequeue failed: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        if let Err(e) = queue.set_status(&job.job_id, JobStatus::Processing).await {
            warn!("worker: failed to mark job {} processing: {e}", job.job_id);
        }

        let state = executor.run(job.source_url.clone(), job.max_retries).await;

        if let Some(error_message) = state.error_message.clone() {
            // A robots.txt denial is an operational decision, not a failure:
            // no DLQ, no notifier (NewsAgent error taxonomy, GovernanceDenied).
            if error_message.starts_with("Blocked by robots.txt") {
                warn!("worker: job {} skipped: {error_message}", job.job_id);
                if let Err(e) = queue.mark_failed(&job.job_id, &error_message).await {
                    warn!("worker: failed to record skip for job {}: {e}", job.job_id);
                }
                continue;
            }

            error!("worker: job {} failed: {error_message}", job.job_id);
            notifier
                .notify(&job.job_id.to_string(), &job.source_url, &error_message, None)
                .await;

            if let Err(e) = queue.dead_letter(&job, &error_message, None).await {
                warn!("worker: failed to dead-letter job {}: {e}", job.job_id);
            }
        } else {
            let result = serde_json::json!({
                "source_url": state.source_url,
                "article": state.article,
            });
            if let Err(e) = queue.mark_completed(&job.job_id, &result).await {
                warn!("worker: failed to record completion for job {}: {e}", job.job_id);
            }
            info!("worker: job {} completed", job.job_id);
        }
    }
}
