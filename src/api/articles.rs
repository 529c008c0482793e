//! Article API endpoints
//!
//! Public site:
//! - GET /api/v1/articles - Published articles, newest first
//! - GET /api/v1/articles/{slug} - One published article
//!
//! Newsroom (authenticated):
//! - GET /api/v1/admin/articles - All articles, filterable by status/author/section
//! - POST /api/v1/admin/articles - Start a draft
//! - GET /api/v1/admin/articles/{id} - Article with the actions open to the caller
//! - PUT /api/v1/admin/articles/{id} - Edit content or taxonomy

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{
    Article, ArticleFilter, ArticleStatus, CreateArticleInput, ListParams, PagedResult,
    ReviewAction, UpdateArticleInput,
};

/// Pagination query shared by list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PageQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_per_page() -> u32 {
    20
}

/// Query parameters for the newsroom article list
#[derive(Debug, Deserialize)]
pub struct AdminArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<ArticleStatus>,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub province_id: Option<i64>,
    /// Case-insensitive title search
    pub q: Option<String>,
}

/// Article as shown on the public site
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicArticle {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content_html: String,
    pub category_id: Option<i64>,
    pub province_id: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Article> for PublicArticle {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            slug: article.slug,
            title: article.title,
            excerpt: article.excerpt,
            content_html: article.content_html,
            category_id: article.category_id,
            province_id: article.province_id,
            published_at: article.published_at,
            updated_at: article.updated_at,
        }
    }
}

/// Newsroom view of one article
#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    /// Workflow actions the caller may take now
    pub allowed_actions: Vec<ReviewAction>,
}

/// Public article routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

/// Newsroom article routes, mounted under `/admin/articles`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route("/{id}", get(get_article).put(update_article))
}

/// GET /api/v1/articles
async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<PublicArticle>>, ApiError> {
    let page = state
        .article_service
        .list_published(&query.params())
        .await?;
    Ok(Json(page.map(PublicArticle::from)))
}

/// GET /api/v1/articles/{slug}
///
/// Anything not published is a 404 here.
async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicArticle>, ApiError> {
    let article = state.article_service.get_published_by_slug(&slug).await?;
    Ok(Json(article.into()))
}

/// GET /api/v1/admin/articles
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<AdminArticlesQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let filter = ArticleFilter {
        status: query.status,
        author_id: query.author_id,
        category_id: query.category_id,
        province_id: query.province_id,
        search: query.q.filter(|q| !q.trim().is_empty()),
    };
    let params = ListParams::new(query.page, query.per_page);

    Ok(Json(state.article_service.list(&filter, &params).await?))
}

/// POST /api/v1/admin/articles
async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(input): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state
        .article_service
        .create_draft(input, &user.0, ip.audit())
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /api/v1/admin/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let article = state.article_service.get(id).await?;
    let allowed_actions = state.workflow_service.allowed_actions(&article, &user.0);
    Ok(Json(ArticleDetail {
        article,
        allowed_actions,
    }))
}

/// PUT /api/v1/admin/articles/{id}
///
/// Send `base_version` to be told (409) when someone else edited first.
async fn update_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    Json(input): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .article_service
        .update_content(id, &user.0, input, ip.audit())
        .await?;
    Ok(Json(article))
}
