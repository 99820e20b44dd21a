use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::models::{AlertLog, Article, FacebookPostLog, FetchLog};
use crate::services::{
    BulkPublishResult, HealthReport, IngestSummary, ModerationResult, PublishOutcome,
};
use crate::web::error::ApiError;

pub type AppState = Arc<App>;

#[derive(Debug, Serialize)]
pub struct FetchRssResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

/// POST /fetch-rss - Run one ingestion pass over every active source.
pub async fn fetch_rss(State(app): State<AppState>) -> Result<Json<FetchRssResponse>, ApiError> {
    let summary = app.run_ingestion().await?;
    Ok(Json(FetchRssResponse {
        message: "RSS fetch completed".to_string(),
        summary,
    }))
}

/// POST /health-check - Evaluate pipeline health and alert subscribers.
pub async fn health_check(State(app): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    Ok(Json(app.check_health().await?))
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub article_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub success: bool,
    pub log_id: i64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_posted: bool,
}

/// POST /post-to-facebook - Relay one published article to the Facebook page.
pub async fn post_to_facebook(
    State(app): State<AppState>,
    Json(req): Json<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let article_id = req
        .article_id
        .ok_or_else(|| ApiError::bad_request("article_id is required"))?;

    match app.publish_to_facebook(article_id).await? {
        PublishOutcome::Posted { log_id } => Ok(Json(PostResponse {
            success: true,
            log_id,
            already_posted: false,
        })),
        PublishOutcome::AlreadyPosted { log_id } => Ok(Json(PostResponse {
            success: true,
            log_id,
            already_posted: true,
        })),
        PublishOutcome::Failed { log_id, error }
        | PublishOutcome::Misconfigured { log_id, error } => {
            Err(ApiError::internal(error).with_log_id(log_id))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkPostRequest {
    #[serde(default)]
    pub article_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkPostResponse {
    pub posted: usize,
    pub failed: usize,
    pub results: Vec<BulkPublishResult>,
}

/// POST /post-to-facebook/bulk - Retry or backfill several articles in order.
pub async fn post_to_facebook_bulk(
    State(app): State<AppState>,
    Json(req): Json<BulkPostRequest>,
) -> Result<Json<BulkPostResponse>, ApiError> {
    if req.article_ids.is_empty() {
        return Err(ApiError::bad_request("article_ids must not be empty"));
    }

    let results = app.publish_many(&req.article_ids).await;
    let posted = results.iter().filter(|r| r.success).count();
    Ok(Json(BulkPostResponse {
        posted,
        failed: results.len() - posted,
        results,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    pub category_id: Option<i64>,
}

/// POST /articles/:id/publish
pub async fn publish_article(
    State(app): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<PublishRequest>>,
) -> Result<Json<ModerationResult>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    Ok(Json(app.publish_article(id, req.category_id).await?))
}

/// POST /articles/:id/reject
pub async fn reject_article(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ModerationResult>, ApiError> {
    Ok(Json(app.reject_article(id).await?))
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view_count: i64,
}

/// POST /articles/:id/view
pub async fn record_view(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ViewResponse>, ApiError> {
    let view_count = app.record_view(id).await?;
    Ok(Json(ViewResponse { view_count }))
}

#[derive(Debug, Deserialize)]
pub struct FetchLogQuery {
    pub limit: Option<i64>,
}

/// GET /fetch-logs - Recent ingestion runs, newest first.
pub async fn fetch_logs(
    State(app): State<AppState>,
    Query(query): Query<FetchLogQuery>,
) -> Result<Json<Vec<FetchLog>>, ApiError> {
    Ok(Json(app.recent_fetch_logs(query.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ArticleListQuery {
    pub status: Option<String>,
}

/// GET /articles?status=pending - Moderation queue, defaults to pending.
pub async fn list_articles(
    State(app): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let status = query.status.as_deref().unwrap_or("pending");
    Ok(Json(app.articles_by_status(status).await?))
}

/// GET /articles/:id/post-logs - Every Facebook delivery attempt for one article.
pub async fn post_logs(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FacebookPostLog>>, ApiError> {
    Ok(Json(app.post_logs(id).await?))
}

/// GET /alert-logs
pub async fn alert_logs(State(app): State<AppState>) -> Result<Json<Vec<AlertLog>>, ApiError> {
    Ok(Json(app.alert_logs().await?))
}

#[derive(Debug, Serialize)]
pub struct SourceStateResponse {
    pub id: i64,
    pub is_active: bool,
}

/// POST /sources/:id/activate
pub async fn activate_source(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SourceStateResponse>, ApiError> {
    app.set_source_active(id, true).await?;
    Ok(Json(SourceStateResponse { id, is_active: true }))
}

/// POST /sources/:id/deactivate
pub async fn deactivate_source(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SourceStateResponse>, ApiError> {
    app.set_source_active(id, false).await?;
    Ok(Json(SourceStateResponse { id, is_active: false }))
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}
