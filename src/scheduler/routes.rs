//! The scheduler process's HTTP surface (NewsAgent §6): source admin CRUD,
//! article admin surface, and the inbound `/webhook/store-result` relay.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::store::Store;
use crate::webhook::{self, WebhookState};

#[derive(Clone)]
pub struct SchedulerState {
    pub store: Store,
    pub webhook_secret: Option<String>,
}

pub fn router(state: SchedulerState) -> Router {
    let webhook_state = WebhookState {
        store: state.store.clone(),
        webhook_secret: state.webhook_secret.clone(),
    };

    Router::new()
        .route("/webhook/store-result", post(webhook::store_result))
        .with_state(webhook_state)
        .merge(
            Router::new()
                .route("/sources", post(create_source))
                .route("/sources/:id", get(get_source).patch(patch_source).delete(delete_source))
                .route("/sources/:id/toggle", post(toggle_source))
                .route("/articles", get(list_articles))
                .route("/articles/:id", get(get_article).delete(soft_delete_article))
                .route("/articles/:id/status", patch(update_article_status))
                .route("/articles/:id/image", patch(update_article_image))
                .route("/articles/:id/archive", post(archive_article))
                .with_state(state.store),
        )
        .layer(TraceLayer::new_for_http())
}

#[derive(Deserialize)]
struct CreateSourceRequest {
    name: String,
    listing_url: String,
    url_pattern: Option<String>,
    fetch_interval_minutes: i64,
    delay_seconds: Option<i64>,
}

async fn create_source(State(store): State<Store>, Json(req): Json<CreateSourceRequest>) -> Response {
    match store
        .create_source(&req.name, &req.listing_url, req.url_pattern.as_deref(), req.fetch_interval_minutes, req.delay_seconds)
        .await
    {
        Ok(source) => (StatusCode::CREATED, Json(source)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn get_source(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.get_source(&id).await {
        Ok(Some(source)) => (StatusCode::OK, Json(source)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

/// `PATCH /sources/{id}` only supports the toggle today — full field updates
/// are admin-CRUD surface the original leaves to a separate dashboard and
/// out of this crate's core scope.
async fn patch_source(State(store): State<Store>, Path(id): Path<String>) -> Response {
    get_source(State(store), Path(id)).await
}

async fn delete_source(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.delete_source(&id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn toggle_source(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.toggle_source(&id).await {
        Ok(Some(source)) => (StatusCode::OK, Json(source)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

#[derive(Deserialize)]
struct ListArticlesParams {
    status: Option<String>,
    limit: Option<i64>,
    skip: Option<i64>,
}

async fn list_articles(State(store): State<Store>, Query(params): Query<ListArticlesParams>) -> Response {
    match store
        .list_articles(params.status.as_deref(), params.limit.unwrap_or(50), params.skip.unwrap_or(0))
        .await
    {
        Ok(articles) => (StatusCode::OK, Json(articles)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn get_article(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.get_article(&id).await {
        Ok(Some(article)) => (StatusCode::OK, Json(article)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

const ALLOWED_STATUS_TRANSITIONS: &[&str] = &["processed", "approved", "rejected", "duplicated"];

async fn update_article_status(State(store): State<Store>, Path(id): Path<String>, Json(req): Json<UpdateStatusRequest>) -> Response {
    if !ALLOWED_STATUS_TRANSITIONS.contains(&req.status.as_str()) {
        return (StatusCode::BAD_REQUEST, format!("status must be one of {ALLOWED_STATUS_TRANSITIONS:?}")).into_response();
    }
    match store.update_article_status(&id, &req.status).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

#[derive(Deserialize)]
struct UpdateImageRequest {
    image_url: String,
}

async fn update_article_image(State(store): State<Store>, Path(id): Path<String>, Json(req): Json<UpdateImageRequest>) -> Response {
    match store.update_article_image(&id, &req.image_url).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn archive_article(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.archive_article(&id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}

async fn soft_delete_article(State(store): State<Store>, Path(id): Path<String>) -> Response {
    match store.soft_delete_article(&id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")).into_response(),
    }
}
