//! Inbound result relay: the scheduler process's `/webhook/store-result`
//! endpoint (NewsAgent §6), guarded by a shared secret header rather than
//! the API key, since the caller here is a worker process, not an end user.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::store::Store;

#[derive(Clone)]
pub struct WebhookState {
    pub store: Store,
    pub webhook_secret: Option<String>,
}

#[derive(Deserialize)]
pub struct StoreResultBody {
    pub source_url: String,
    pub data: serde_json::Value,
}

pub async fn store_result(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(body): Json<StoreResultBody>,
) -> StatusCode {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers.get("X-Webhook-Secret").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED;
        }
    }

    match state.store.store_result(&body.source_url, &body.data).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("store_result failed for {}: {e}", body.source_url);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
