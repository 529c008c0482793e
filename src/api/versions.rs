//! Version history endpoints
//!
//! - GET /api/v1/admin/articles/{id}/versions
//! - GET /api/v1/admin/articles/{id}/versions/compare?from=&to=
//! - GET /api/v1/admin/articles/{id}/versions/{n}
//! - POST /api/v1/admin/articles/{id}/versions/{n}/restore

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{Article, ArticleVersion, VersionComparison, VersionSummary};

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub from: i64,
    pub to: i64,
}

/// Version routes, mounted under `/admin/articles`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/compare", get(compare_versions))
        .route("/{id}/versions/{n}", get(get_version))
        .route("/{id}/versions/{n}/restore", post(restore_version))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<VersionSummary>>, ApiError> {
    Ok(Json(state.version_service.list(id).await?))
}

async fn get_version(
    State(state): State<AppState>,
    Path((id, n)): Path<(i64, i64)>,
) -> Result<Json<ArticleVersion>, ApiError> {
    Ok(Json(state.version_service.get(id, n).await?))
}

async fn compare_versions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<VersionComparison>, ApiError> {
    Ok(Json(
        state
            .version_service
            .compare(id, query.from, query.to)
            .await?,
    ))
}

async fn restore_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path((id, n)): Path<(i64, i64)>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .version_service
        .restore(id, n, &user.0, ip.audit())
        .await?;
    Ok(Json(article))
}
