//! Job API (C7): the synchronous HTTP surface for submitting jobs and
//! inspecting queue/job state (NewsAgent §4.7/§6). Every route except
//! `/health` requires the `X-API-Key` header.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::models::JobEnvelope;
use crate::queue::WorkQueue;
use crate::store::Store;

#[derive(Clone)]
pub struct ApiState {
    pub queue: WorkQueue,
    pub store: Store,
    pub api_key: String,
}

pub fn router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/submit-job", post(submit_job))
        .route("/jobs/:id", get(job_status))
        .route("/queue/status", get(queue_status))
        .route("/queue/main/items", get(main_items))
        .route("/queue/dlq/items", get(dlq_items))
        .route("/queue/dlq/count", get(dlq_count))
        .route("/queue/dlq/requeue/:job_id", post(requeue_one))
        .route("/queue/dlq/requeue-all", post(requeue_all))
        .route("/queue/dlq/:job_id", delete(delete_from_dlq))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<ApiState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let provided = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    if provided != Some(state.api_key.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    redis: bool,
    graph_logic: bool,
}

async fn health(State(mut state): State<ApiState>) -> Response {
    let redis_ok = state.queue.counts().await.is_ok();
    let graph_logic_ok = state.store.load_agent_prompts().await.is_ok();

    let body = HealthResponse {
        status: if redis_ok && graph_logic_ok { "ok" } else { "degraded" },
        redis: redis_ok,
        graph_logic: graph_logic_ok,
    };

    let status = if redis_ok && graph_logic_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body)).into_response()
}

#[derive(Deserialize)]
struct SubmitJobRequest {
    source_url: String,
    max_retries: Option<u32>,
}

#[derive(Serialize)]
struct SubmitJobResponse {
    job_id: Uuid,
    status: &'static str,
    queue_position: i64,
    message: String,
}

async fn submit_job(State(mut state): State<ApiState>, Json(req): Json<SubmitJobRequest>) -> Response {
    let job = JobEnvelope::new(req.source_url, req.max_retries.unwrap_or(3), Utc::now().to_rfc3339());

    match state.queue.enqueue(&job).await {
        Ok(position) => (
            StatusCode::ACCEPTED,
            Json(SubmitJobResponse {
                job_id: job.job_id,
                status: "queued",
                queue_position: position,
                message: "job accepted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("queue unreachable: {e}")).into_response(),
    }
}

async fn job_status(State(mut state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.queue.status(&id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

#[derive(Serialize)]
struct QueueStatusResponse {
    main_depth: i64,
    dlq_depth: i64,
}

async fn queue_status(State(mut state): State<ApiState>) -> Response {
    match state.queue.counts().await {
        Ok((main_depth, dlq_depth)) => (StatusCode::OK, Json(QueueStatusResponse { main_depth, dlq_depth })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

#[derive(Deserialize)]
struct PageParams {
    limit: Option<isize>,
    offset: Option<isize>,
}

async fn main_items(State(mut state): State<ApiState>, Query(params): Query<PageParams>) -> Response {
    let (start, stop) = page_bounds(&params);
    match state.queue.peek_main(start, stop).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn dlq_items(State(mut state): State<ApiState>, Query(params): Query<PageParams>) -> Response {
    let (start, stop) = page_bounds(&params);
    match state.queue.peek_dlq(start, stop).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

fn page_bounds(params: &PageParams) -> (isize, isize) {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(50);
    (offset, offset + limit - 1)
}

async fn dlq_count(State(mut state): State<ApiState>) -> Response {
    match state.queue.counts().await {
        Ok((_, dlq_depth)) => (StatusCode::OK, Json(serde_json::json!({ "count": dlq_depth }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn requeue_one(State(mut state): State<ApiState>, Path(job_id): Path<Uuid>) -> Response {
    match state.queue.requeue(&job_id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn requeue_all(State(mut state): State<ApiState>) -> Response {
    match state.queue.requeue_all().await {
        Ok(moved) => (StatusCode::OK, Json(serde_json::json!({ "moved": moved }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn delete_from_dlq(State(mut state): State<ApiState>, Path(job_id): Path<Uuid>) -> Response {
    match state.queue.delete_from_dlq(&job_id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

