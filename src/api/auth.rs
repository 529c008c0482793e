//! Authentication API endpoints
//!
//! Handles HTTP requests for newsroom staff authentication:
//! - GET /api/v1/auth/setup - Whether the first admin still has to be created
//! - POST /api/v1/auth/setup - Create the first admin
//! - POST /api/v1/auth/login - Open a session (bearer token)
//! - POST /api/v1/auth/logout - Close the current session
//! - GET /api/v1/auth/me - Current staff member

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{bearer_token, ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{AdminUser, CreateAdminUserInput};
use crate::services::LoginInput;

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    pub password: String,
}

/// Response for successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AdminUser,
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub needs_setup: bool,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/setup", get(setup_status).post(setup))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// GET /api/v1/auth/setup
async fn setup_status(
    State(state): State<AppState>,
) -> Result<Json<SetupStatusResponse>, ApiError> {
    let needs_setup = state.auth_service.needs_setup().await?;
    Ok(Json(SetupStatusResponse { needs_setup }))
}

/// POST /api/v1/auth/setup
///
/// Only works while no staff account exists.
async fn setup(
    State(state): State<AppState>,
    Json(input): Json<CreateAdminUserInput>,
) -> Result<(StatusCode, Json<AdminUser>), ApiError> {
    let user = state.auth_service.setup(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (session, user) = state
        .auth_service
        .login(LoginInput::new(body.login, body.password), ip.0)
        .await?;

    Ok(Json(LoginResponse {
        token: session.id,
        expires_at: session.expires_at,
        user,
    }))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.auth_service.logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<AdminUser> {
    Json(user.0)
}
