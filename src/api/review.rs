//! Review workflow endpoints
//!
//! - POST /api/v1/admin/articles/{id}/{submit|withdraw|reopen} - Author actions
//! - POST /api/v1/admin/articles/{id}/{approve|request-changes|reject|publish|unpublish} - Editor actions
//! - GET /api/v1/admin/articles/{id}/actions - Actions open to the caller
//! - GET /api/v1/admin/articles/{id}/review-history - Audit trail of the article
//! - GET /api/v1/admin/review/queue - Articles waiting in a status
//! - GET /api/v1/admin/review/stats - Article count per status
//!
//! Action bodies are optional: `{ "notes": "..." }`. Notes are required to
//! request changes or reject.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::articles::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{
    Article, ArticleStatus, AuditLog, ListParams, PagedResult, ReviewAction, StatusCount,
};

/// Optional body of a workflow action
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Defaults to `pending_review`
    pub status: Option<ArticleStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Serialize)]
pub struct AllowedActionsResponse {
    pub article_id: i64,
    pub status: ArticleStatus,
    pub actions: Vec<ReviewAction>,
}

#[derive(Debug, Serialize)]
pub struct ReviewStatsResponse {
    pub counts: Vec<StatusCount>,
    pub total: i64,
}

/// Actions any author may take on their own article, mounted under `/admin/articles`
pub fn author_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/submit", post(submit))
        .route("/{id}/withdraw", post(withdraw))
        .route("/{id}/reopen", post(reopen))
        .route("/{id}/actions", get(allowed_actions))
        .route("/{id}/review-history", get(review_history))
}

/// Editor-only article actions, mounted under `/admin/articles`
pub fn editor_article_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/approve", post(approve))
        .route("/{id}/request-changes", post(request_changes))
        .route("/{id}/reject", post(reject))
        .route("/{id}/publish", post(publish))
        .route("/{id}/unpublish", post(unpublish))
}

/// Review desk routes, mounted under `/admin/review`
pub fn desk_router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(review_queue))
        .route("/stats", get(review_stats))
}

fn parse_body(body: &Bytes) -> Result<ReviewRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReviewRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))
}

async fn apply_action(
    state: &AppState,
    user: &AuthenticatedUser,
    id: i64,
    ip: ClientIp,
    body: &Bytes,
    action: ReviewAction,
) -> Result<Json<Article>, ApiError> {
    let request = parse_body(body)?;
    let article = state
        .workflow_service
        .apply(id, &user.0, action, request.notes, ip.audit())
        .await?;
    Ok(Json(article))
}

async fn submit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Submit).await
}

async fn withdraw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Withdraw).await
}

async fn reopen(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Reopen).await
}

async fn approve(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Approve).await
}

async fn request_changes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::RequestChanges).await
}

async fn reject(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Reject).await
}

async fn publish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Publish).await
}

async fn unpublish(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    apply_action(&state, &user, id, ip, &body, ReviewAction::Unpublish).await
}

/// GET /api/v1/admin/articles/{id}/actions
async fn allowed_actions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<AllowedActionsResponse>, ApiError> {
    let article = state.article_service.get(id).await?;
    Ok(Json(AllowedActionsResponse {
        article_id: article.id,
        status: article.status,
        actions: state.workflow_service.allowed_actions(&article, &user.0),
    }))
}

/// GET /api/v1/admin/articles/{id}/review-history
async fn review_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<crate::api::articles::PageQuery>,
) -> Result<Json<PagedResult<AuditLog>>, ApiError> {
    let history = state
        .workflow_service
        .review_history(id, &query.params())
        .await?;
    Ok(Json(history))
}

/// GET /api/v1/admin/review/queue
async fn review_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .workflow_service
            .review_queue(query.status, &params)
            .await?,
    ))
}

/// GET /api/v1/admin/review/stats
async fn review_stats(
    State(state): State<AppState>,
) -> Result<Json<ReviewStatsResponse>, ApiError> {
    let counts = state.workflow_service.status_counts().await?;
    let total = counts.iter().map(|c| c.count).sum();
    Ok(Json(ReviewStatsResponse { counts, total }))
}
