//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - `ApiError`, the JSON error body, and conversions from service errors
//! - Authentication (bearer session tokens) and role guards
//! - Client IP extraction for auditing and login throttling (proxy headers
//!   only when `server.trust_proxy` is set)

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAdminUserRepository, SqlxArticleRepository, SqlxAuditLogRepository,
    SqlxEditorialCommentRepository, SqlxSessionRepository, SqlxTaxonomyRepository,
    SqlxVersionRepository,
};
use crate::db::DynDatabasePool;
use crate::models::AdminUser;
use crate::services::{
    classify_database_error, ArticleService, ArticleServiceError, AuditService, AuthError,
    AuthService, CommentError, DbErrorKind, EditorialCommentService, EditorialPolicy,
    LoginRateLimiter, VersionError, VersionService, WorkflowError, WorkflowService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub article_service: Arc<ArticleService>,
    pub workflow_service: Arc<WorkflowService>,
    pub version_service: Arc<VersionService>,
    pub comment_service: Arc<EditorialCommentService>,
    pub audit_service: Arc<AuditService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub trust_proxy: bool,
}

impl AppState {
    /// Wire repositories and services on top of a migrated pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let cache = create_cache(&config.cache);
        let audit_service = Arc::new(AuditService::new(SqlxAuditLogRepository::boxed(
            pool.clone(),
        )));
        let rate_limiter = Arc::new(LoginRateLimiter::new(config.rate_limit.clone()));

        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let comment_repo = SqlxEditorialCommentRepository::boxed(pool.clone());
        let version_repo = SqlxVersionRepository::boxed(pool.clone());

        let auth_service = Arc::new(AuthService::new(
            SqlxAdminUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            rate_limiter.clone(),
            audit_service.clone(),
            config.auth.session_ttl_hours,
        ));
        let article_service = Arc::new(ArticleService::new(
            article_repo.clone(),
            SqlxTaxonomyRepository::boxed(pool.clone()),
            audit_service.clone(),
            cache.clone(),
            config.editorial.clone(),
        ));
        let workflow_service = Arc::new(WorkflowService::new(
            article_repo.clone(),
            comment_repo.clone(),
            audit_service.clone(),
            cache,
            EditorialPolicy::from(&config.editorial),
        ));
        let version_service = Arc::new(VersionService::new(
            version_repo.clone(),
            article_service.clone(),
        ));
        let comment_service = Arc::new(EditorialCommentService::new(
            comment_repo,
            article_repo,
            version_repo,
            audit_service.clone(),
        ));

        Self {
            pool,
            auth_service,
            article_service,
            workflow_service,
            version_service,
            comment_service,
            audit_service,
            rate_limiter,
            trust_proxy: config.server.trust_proxy,
        }
    }
}

/// Authenticated staff member extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AdminUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Client address of the request.
///
/// Proxy headers are honoured only when `server.trust_proxy` is on;
/// otherwise the socket peer is used, so a client cannot pick its own address.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Text form for audit entries
    pub fn audit(&self) -> Option<String> {
        self.0.map(|ip| ip.to_string())
    }

    fn from_parts(parts: &Parts, trust_proxy: bool) -> Self {
        let forwarded = if trust_proxy {
            forwarded_ip(&parts.headers)
        } else {
            None
        };
        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });
        ClientIp(ip)
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, state.trust_proxy))
    }
}

/// First address in X-Forwarded-For, or X-Real-IP
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Map an unexpected error, letting recognisable database failures
    /// surface as client or availability errors
    pub fn internal(err: anyhow::Error) -> Self {
        match classify_database_error(&err) {
            Some(info) => match info.kind {
                DbErrorKind::UniqueViolation => Self::with_details(
                    "CONFLICT",
                    "A record with the same unique value already exists",
                    serde_json::json!({ "constraint": info.target }),
                ),
                DbErrorKind::ForeignKeyViolation
                | DbErrorKind::NotNullViolation
                | DbErrorKind::CheckViolation => Self::with_details(
                    "VALIDATION_ERROR",
                    "The request violates a data constraint",
                    serde_json::json!({ "kind": info.kind, "constraint": info.target }),
                ),
                DbErrorKind::Connection => {
                    tracing::error!(error = %err, "Database unavailable");
                    Self::new("SERVICE_UNAVAILABLE", "Database is unavailable")
                }
                DbErrorKind::Other => {
                    tracing::error!(error = ?err, "Database error");
                    Self::internal_error("Internal server error")
                }
            },
            None => {
                tracing::error!(error = ?err, "Internal error");
                Self::internal_error("Internal server error")
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" | "INVALID_TRANSITION" => StatusCode::CONFLICT,
            "ARTICLE_LOCKED" => StatusCode::LOCKED,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self
            .error
            .details
            .as_ref()
            .and_then(|d| d.get("retry_after"))
            .and_then(|v| v.as_i64());

        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(what) => {
                Self::not_found(format!("Article not found: {}", what))
            }
            ArticleServiceError::Validation(msg) => Self::validation_error(msg),
            ArticleServiceError::DuplicateSlug(slug) => Self::with_details(
                "CONFLICT",
                format!("Slug '{}' is already taken", slug),
                serde_json::json!({ "slug": slug }),
            ),
            ArticleServiceError::Forbidden(msg) => Self::forbidden(msg),
            ArticleServiceError::Locked(msg) => Self::new("ARTICLE_LOCKED", msg),
            ArticleServiceError::Conflict {
                message,
                current_version,
            } => Self::with_details(
                "CONFLICT",
                message,
                serde_json::json!({ "current_version": current_version }),
            ),
            ArticleServiceError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(id) => Self::not_found(format!("Article not found: {}", id)),
            WorkflowError::InvalidTransition { from, action } => Self::with_details(
                "INVALID_TRANSITION",
                format!("Cannot {} an article in status {}", action, from),
                serde_json::json!({ "from": from, "action": action }),
            ),
            WorkflowError::Forbidden(msg) => Self::forbidden(msg),
            e @ WorkflowError::NotesRequired(_) => Self::validation_error(e.to_string()),
            WorkflowError::OpenComments(count) => Self::with_details(
                "CONFLICT",
                format!("Resolve the {} open editorial comment(s) before publishing", count),
                serde_json::json!({ "unresolved_comments": count }),
            ),
            WorkflowError::Conflict(msg) => Self::conflict(msg),
            WorkflowError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<VersionError> for ApiError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::NotFound(what) => {
                Self::not_found(format!("Version not found: {}", what))
            }
            VersionError::Article(e) => e.into(),
            VersionError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<CommentError> for ApiError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            CommentError::Validation(msg) => Self::validation_error(msg),
            CommentError::Forbidden(msg) => Self::forbidden(msg),
            CommentError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::validation_error(msg),
            e @ AuthError::InvalidCredentials => Self::unauthorized(e.to_string()),
            e @ AuthError::AccountDisabled => Self::forbidden(e.to_string()),
            AuthError::RateLimited { retry_after } => Self::with_details(
                "RATE_LIMITED",
                format!("Too many login attempts, retry in {} seconds", retry_after),
                serde_json::json!({ "retry_after": retry_after }),
            ),
            e @ AuthError::AlreadySetUp => Self::conflict(e.to_string()),
            e @ AuthError::UserExists(_) => Self::conflict(e.to_string()),
            AuthError::UserNotFound => Self::not_found("User not found"),
            AuthError::Forbidden(msg) => Self::forbidden(msg),
            AuthError::Internal(e) => Self::internal(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?
        .to_string();

    let user = state
        .auth_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Editor authorization middleware
pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_editor() {
        return Err(ApiError::forbidden("Editor privileges required"));
    }

    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// JSON 404 for unknown API paths
pub async fn not_found_fallback() -> ApiError {
    ApiError::not_found("No such endpoint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleStatus, ReviewAction};

    #[test]
    fn test_status_mapping() {
        let cases = [
            ("VALIDATION_ERROR", StatusCode::BAD_REQUEST),
            ("UNAUTHORIZED", StatusCode::UNAUTHORIZED),
            ("FORBIDDEN", StatusCode::FORBIDDEN),
            ("NOT_FOUND", StatusCode::NOT_FOUND),
            ("CONFLICT", StatusCode::CONFLICT),
            ("INVALID_TRANSITION", StatusCode::CONFLICT),
            ("ARTICLE_LOCKED", StatusCode::LOCKED),
            ("RATE_LIMITED", StatusCode::TOO_MANY_REQUESTS),
            ("SERVICE_UNAVAILABLE", StatusCode::SERVICE_UNAVAILABLE),
            ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            assert_eq!(ApiError::new(code, "x").status(), status, "{}", code);
        }
    }

    #[test]
    fn test_workflow_error_conversion() {
        let err: ApiError = WorkflowError::InvalidTransition {
            from: ArticleStatus::Draft,
            action: ReviewAction::Publish,
        }
        .into();
        assert_eq!(err.error.code, "INVALID_TRANSITION");
        let details = err.error.details.unwrap();
        assert_eq!(details["from"], "draft");
        assert_eq!(details["action"], "publish");
    }

    #[test]
    fn test_conflict_carries_current_version() {
        let err: ApiError = ArticleServiceError::Conflict {
            message: "stale".to_string(),
            current_version: 4,
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.error.details.unwrap()["current_version"], 4);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let err: ApiError = AuthError::RateLimited { retry_after: 30 }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }

    #[test]
    fn test_database_errors_are_classified() {
        let err = anyhow::Error::new(sqlx::Error::PoolTimedOut).context("Failed to list articles");
        assert_eq!(ApiError::internal(err).status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = anyhow::anyhow!("something odd");
        assert_eq!(ApiError::internal(err).error.code, "INTERNAL_ERROR");
    }

    #[test]
    fn test_forwarded_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(forwarded_ip(&headers), "203.0.113.9".parse().ok());

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(forwarded_ip(&headers), "198.51.100.4".parse().ok());

        assert_eq!(forwarded_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_client_ip_ignores_headers_unless_proxy_trusted() {
        let (mut parts, _) = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 41000))));

        let peer: IpAddr = "10.0.0.7".parse().unwrap();
        let forwarded: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(ClientIp::from_parts(&parts, false).0, Some(peer));
        assert_eq!(ClientIp::from_parts(&parts, true).0, Some(forwarded));

        parts.headers.clear();
        assert_eq!(ClientIp::from_parts(&parts, true).0, Some(peer));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(bearer_token(&headers), Some("abc-123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
