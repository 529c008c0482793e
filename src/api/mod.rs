//! API layer - HTTP handlers and routing
//!
//! JSON API of the SafraReport editorial backend, mounted at `/api/v1`:
//! - Public site: published articles, sections and provinces
//! - Auth: first-run setup, login and logout
//! - Newsroom: drafting, review workflow, versions and editorial comments
//! - Admin: staff accounts and the audit log

pub mod admin;
pub mod articles;
pub mod auth;
pub mod comments;
pub mod health;
pub mod middleware;
pub mod review;
pub mod taxonomy;
pub mod versions;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Staff accounts and audit trail
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Review decisions and the review desk
    let editor_routes = Router::new()
        .nest("/admin/articles", review::editor_article_router())
        .nest("/admin/review", review::desk_router())
        .route_layer(axum_middleware::from_fn(middleware::require_editor))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Any signed-in staff member
    let newsroom_articles = Router::new()
        .merge(articles::admin_router())
        .merge(review::author_router())
        .merge(versions::router())
        .merge(comments::article_router());
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/admin/articles", newsroom_articles)
        .nest("/admin/comments", comments::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(health::router())
        .merge(taxonomy::router())
        .nest("/articles", articles::public_router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(editor_routes)
        .merge(protected_routes)
        .fallback(middleware::not_found_fallback)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = if cors_origin == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(cors_origin, error = %e, "Invalid CORS origin, allowing none");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
