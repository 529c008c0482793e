//! Taxonomy API endpoints
//!
//! - GET /api/v1/categories - Newsroom sections
//! - GET /api/v1/provinces - Dominican provinces and the Distrito Nacional

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, Province};

/// Public taxonomy routes, merged at the API root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/provinces", get(list_provinces))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.article_service.categories().await?))
}

async fn list_provinces(State(state): State<AppState>) -> Result<Json<Vec<Province>>, ApiError> {
    Ok(Json(state.article_service.provinces().await?))
}
