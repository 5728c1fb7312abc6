//! Stage 16: notify_webhook (grounded in `graph/nodes/notify_webhook.py`).
//!
//! Terminal stage: POSTs the enriched article to the configured webhook.
//! Never fails the pipeline — a non-2xx response or timeout is logged and
//! swallowed, matching the original's fire-and-forget delivery (NewsAgent §4.8).

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use tracing::{info, warn};

use crate::models::WorkflowState;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);
const ACCEPTED_STATUSES: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

pub async fn notify_webhook(
    state: WorkflowState,
    client: &reqwest::Client,
    webhook_url: Option<&str>,
    webhook_secret: Option<&str>,
) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(webhook_url) = webhook_url else {
        return state;
    };
    let Some(article) = state.article.clone() else {
        return state;
    };

    let body = json!({
        "source_url": state.source_url,
        "status": "success",
        "data": article,
    });

    let mut request = client
        .post(webhook_url)
        .timeout(WEBHOOK_TIMEOUT)
        .header("Content-Type", "application/json")
        .header("User-Agent", "NewsAgent/1.0")
        .json(&body);
    if let Some(secret) = webhook_secret {
        request = request.header("X-Webhook-Secret", secret);
    }

    match request.send().await {
        Ok(resp) if ACCEPTED_STATUSES.contains(&resp.status()) => {
            info!("webhook delivered for {}", state.source_url);
        }
        Ok(resp) => {
            warn!("webhook returned non-accepted status {} for {}", resp.status(), state.source_url);
        }
        Err(e) => {
            warn!("webhook delivery failed for {}: {e}", state.source_url);
        }
    }

    state
}
