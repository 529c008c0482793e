//! Admin API endpoints
//!
//! Staff accounts and the audit trail. All routes require the admin role:
//! - GET /api/v1/admin/users - List staff accounts
//! - POST /api/v1/admin/users - Create a staff account
//! - PUT /api/v1/admin/users/{id} - Change role or active flag
//! - GET /api/v1/admin/audit-logs - Filtered, paginated audit trail

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::articles::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    AdminUser, AuditLog, AuditLogQuery, CreateAdminUserInput, ListParams, PagedResult,
    UpdateAdminUserInput,
};

/// Query parameters for the audit log
#[derive(Debug, Deserialize)]
pub struct AuditLogsQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub admin_user_id: Option<i64>,
    /// Action prefix, e.g. `article.` or `auth.login`
    pub action: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Build the admin router, mounted under `/admin`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user))
        .route("/audit-logs", get(list_audit_logs))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AdminUser>>, ApiError> {
    Ok(Json(state.auth_service.list_users().await?))
}

async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateAdminUserInput>,
) -> Result<(StatusCode, Json<AdminUser>), ApiError> {
    let created = state.auth_service.create_user(&user.0, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateAdminUserInput>,
) -> Result<Json<AdminUser>, ApiError> {
    Ok(Json(state.auth_service.update_user(&user.0, id, input).await?))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogsQuery>,
) -> Result<Json<PagedResult<AuditLog>>, ApiError> {
    let filter = AuditLogQuery {
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        admin_user_id: query.admin_user_id,
        action_prefix: query.action.filter(|a| !a.is_empty()),
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.audit_service.list(&filter, &params).await?))
}
