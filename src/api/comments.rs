//! Editorial comment endpoints
//!
//! - GET /api/v1/admin/articles/{id}/comments?include_resolved=true
//! - POST /api/v1/admin/articles/{id}/comments
//! - POST /api/v1/admin/comments/{id}/resolve
//! - POST /api/v1/admin/comments/{id}/reopen
//! - DELETE /api/v1/admin/comments/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{CommentThread, CreateEditorialCommentInput, EditorialComment};

#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub threads: Vec<CommentThread>,
    pub unresolved: i64,
}

/// Comment routes on an article, mounted under `/admin/articles`
pub fn article_router() -> Router<AppState> {
    Router::new().route("/{id}/comments", get(list_comments).post(add_comment))
}

/// Comment routes by comment id, mounted under `/admin/comments`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/resolve", post(resolve_comment))
        .route("/{id}/reopen", post(reopen_comment))
        .route("/{id}", axum::routing::delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let threads = state
        .comment_service
        .list(article_id, query.include_resolved)
        .await?;
    let unresolved = state.comment_service.unresolved_count(article_id).await?;
    Ok(Json(CommentListResponse {
        threads,
        unresolved,
    }))
}

async fn add_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(article_id): Path<i64>,
    Json(input): Json<CreateEditorialCommentInput>,
) -> Result<(StatusCode, Json<EditorialComment>), ApiError> {
    let comment = state
        .comment_service
        .add(article_id, &user.0, input, ip.audit())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn resolve_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<EditorialComment>, ApiError> {
    Ok(Json(
        state.comment_service.resolve(id, &user.0, ip.audit()).await?,
    ))
}

async fn reopen_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<EditorialComment>, ApiError> {
    Ok(Json(
        state.comment_service.reopen(id, &user.0, ip.audit()).await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .comment_service
        .delete(id, &user.0, ip.audit())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
