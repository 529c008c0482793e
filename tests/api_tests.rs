//! HTTP tests against the full `/api/v1` router on in-memory SQLite

use axum::extract::ConnectInfo;
use axum::Extension;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use std::net::SocketAddr;
use serde_json::{json, Value};

use safra_report::api::{build_router, AppState};
use safra_report::config::Config;
use safra_report::db::{create_test_pool, migrations};

const PASSWORD: &str = "clave-segura-123";

struct Newsroom {
    server: TestServer,
    admin: String,
    editor: String,
    author: String,
}

async fn server_with(config: Config) -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let state = AppState::new(pool, &config);
    TestServer::new(build_router(state, "*")).expect("Failed to start test server")
}

/// Server whose every request arrives from one socket peer
async fn server_behind_peer(config: Config) -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let state = AppState::new(pool, &config);
    let peer = SocketAddr::from(([192, 0, 2, 10], 40_000));
    let app = build_router(state, "*").layer(Extension(ConnectInfo(peer)));
    TestServer::new(app).expect("Failed to start test server")
}

/// Failed logins from one peer, each claiming a fresh X-Forwarded-For address
async fn rotating_logins(server: &TestServer, count: usize) -> Vec<StatusCode> {
    let mut statuses = Vec::with_capacity(count);
    for i in 0..count {
        let spoofed = format!("203.0.113.{}", i + 1);
        let response = server
            .post("/api/v1/auth/login")
            .add_header(
                HeaderName::from_static("x-forwarded-for"),
                HeaderValue::from_str(&spoofed).unwrap(),
            )
            .json(&json!({ "login": format!("intruso{}", i), "password": "incorrecta" }))
            .await;
        statuses.push(response.status_code());
    }
    statuses
}

fn throttled_config(trust_proxy: bool) -> Config {
    let mut config = Config::default();
    config.rate_limit.ip_requests = 3;
    config.server.trust_proxy = trust_proxy;
    config
}

async fn login(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "login": username, "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

async fn create_staff(server: &TestServer, admin: &str, username: &str, role: &str) {
    server
        .post("/api/v1/admin/users")
        .authorization_bearer(admin)
        .json(&json!({
            "username": username,
            "email": format!("{}@safrareport.com", username),
            "password": PASSWORD,
            "role": role,
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Admin, editor and author, each logged in
async fn newsroom_with(config: Config) -> Newsroom {
    let server = server_with(config).await;

    server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "username": "directora",
            "email": "directora@safrareport.com",
            "password": PASSWORD,
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let admin = login(&server, "directora").await;

    create_staff(&server, &admin, "editora", "editor").await;
    create_staff(&server, &admin, "cronista", "author").await;
    let editor = login(&server, "editora").await;
    let author = login(&server, "cronista").await;

    Newsroom {
        server,
        admin,
        editor,
        author,
    }
}

async fn newsroom() -> Newsroom {
    newsroom_with(Config::default()).await
}

async fn create_draft(n: &Newsroom, title: &str) -> Value {
    let response = n
        .server
        .post("/api/v1/admin/articles")
        .authorization_bearer(&n.author)
        .json(&json!({
            "title": title,
            "content": "Primer párrafo.\n\nSegundo párrafo.",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

async fn act(n: &Newsroom, token: &str, id: i64, action: &str, notes: Option<&str>) -> Value {
    let request = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/{}", id, action))
        .authorization_bearer(token);
    let response = match notes {
        Some(notes) => request.json(&json!({ "notes": notes })).await,
        None => request.await,
    };
    response.assert_status_ok();
    response.json::<Value>()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let server = server_with(Config::default()).await;
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["database"], "ok");
}

#[tokio::test]
async fn test_setup_only_once() {
    let n = newsroom().await;

    let status = n.server.get("/api/v1/auth/setup").await.json::<Value>();
    assert_eq!(status["needs_setup"], false);

    let response = n
        .server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "username": "intruso",
            "email": "intruso@example.com",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_me_logout() {
    let n = newsroom().await;

    let me = n
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer(&n.author)
        .await
        .json::<Value>();
    assert_eq!(me["username"], "cronista");
    assert_eq!(me["role"], "author");
    assert!(me.get("password_hash").is_none());

    n.server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    n.server
        .get("/api/v1/auth/me")
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password() {
    let n = newsroom().await;
    let response = n
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "login": "cronista", "password": "incorrecta" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response.json::<Value>()), "UNAUTHORIZED");
}

#[tokio::test]
async fn test_forwarded_header_cannot_dodge_ip_throttle() {
    let server = server_behind_peer(throttled_config(false)).await;
    let statuses = rotating_logins(&server, 10).await;

    assert!(statuses[..3].iter().all(|s| *s == StatusCode::UNAUTHORIZED));
    assert!(statuses[3..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_trusted_proxy_throttles_by_forwarded_address() {
    let server = server_behind_peer(throttled_config(true)).await;
    let statuses = rotating_logins(&server, 10).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_role_guards() {
    let n = newsroom().await;

    n.server
        .get("/api/v1/admin/articles")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    n.server
        .get("/api/v1/admin/users")
        .authorization_bearer(&n.editor)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    n.server
        .get("/api/v1/admin/review/queue")
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let users = n
        .server
        .get("/api/v1/admin/users")
        .authorization_bearer(&n.admin)
        .await
        .json::<Value>();
    assert_eq!(users.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_review_cycle_to_publication() {
    let n = newsroom().await;
    let draft = create_draft(&n, "Apagones en Santiago").await;
    let id = draft["id"].as_i64().unwrap();
    assert_eq!(draft["slug"], "apagones-en-santiago");
    assert_eq!(draft["status"], "draft");

    // Not public yet
    n.server
        .get("/api/v1/articles/apagones-en-santiago")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    act(&n, &n.author, id, "submit", None).await;

    // Authors cannot decide on their own submission
    n.server
        .post(&format!("/api/v1/admin/articles/{}/approve", id))
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Notes are required to send it back
    let response = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/request-changes", id))
        .authorization_bearer(&n.editor)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let sent_back = act(&n, &n.editor, id, "request-changes", Some("Confirmar cifras")).await;
    assert_eq!(sent_back["status"], "needs_changes");
    assert_eq!(sent_back["review_notes"], "Confirmar cifras");

    n.server
        .put(&format!("/api/v1/admin/articles/{}", id))
        .authorization_bearer(&n.author)
        .json(&json!({
            "content": "Cifras confirmadas con la distribuidora.",
            "change_summary": "Cifras verificadas",
        }))
        .await
        .assert_status_ok();

    act(&n, &n.author, id, "submit", None).await;
    act(&n, &n.editor, id, "approve", None).await;
    let published = act(&n, &n.editor, id, "publish", None).await;
    assert_eq!(published["status"], "published");
    assert!(published["published_at"].is_string());

    let public = n
        .server
        .get("/api/v1/articles/apagones-en-santiago")
        .await
        .json::<Value>();
    assert_eq!(public["title"], "Apagones en Santiago");
    assert!(public.get("review_notes").is_none());

    let listing = n.server.get("/api/v1/articles").await.json::<Value>();
    assert_eq!(listing["total"], 1);

    let history = n
        .server
        .get(&format!("/api/v1/admin/articles/{}/review-history", id))
        .authorization_bearer(&n.editor)
        .await
        .json::<Value>();
    assert_eq!(history["items"][0]["action"], "article.publish");

    // Unpublishing takes it off the public site
    act(&n, &n.editor, id, "unpublish", None).await;
    n.server
        .get("/api/v1/articles/apagones-en-santiago")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_transition() {
    let n = newsroom().await;
    let id = create_draft(&n, "Carnaval de La Vega").await["id"]
        .as_i64()
        .unwrap();

    let response = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/publish", id))
        .authorization_bearer(&n.editor)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(error_code(&body), "INVALID_TRANSITION");
    assert_eq!(body["error"]["details"]["from"], "draft");
}

#[tokio::test]
async fn test_pending_review_is_locked() {
    let n = newsroom().await;
    let id = create_draft(&n, "Serie del Caribe").await["id"]
        .as_i64()
        .unwrap();
    act(&n, &n.author, id, "submit", None).await;

    let response = n
        .server
        .put(&format!("/api/v1/admin/articles/{}", id))
        .authorization_bearer(&n.author)
        .json(&json!({ "title": "Serie del Caribe 2026" }))
        .await;
    response.assert_status(StatusCode::LOCKED);
    assert_eq!(error_code(&response.json::<Value>()), "ARTICLE_LOCKED");
}

#[tokio::test]
async fn test_stale_edit_conflicts() {
    let n = newsroom().await;
    let id = create_draft(&n, "Presupuesto nacional").await["id"]
        .as_i64()
        .unwrap();

    n.server
        .put(&format!("/api/v1/admin/articles/{}", id))
        .authorization_bearer(&n.editor)
        .json(&json!({ "content": "Versión de la editora", "base_version": 1 }))
        .await
        .assert_status_ok();

    let response = n
        .server
        .put(&format!("/api/v1/admin/articles/{}", id))
        .authorization_bearer(&n.author)
        .json(&json!({ "content": "Versión del cronista", "base_version": 1 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["details"]["current_version"], 2);
}

#[tokio::test]
async fn test_versions_compare_and_restore() {
    let n = newsroom().await;
    let id = create_draft(&n, "Turismo en Samaná").await["id"]
        .as_i64()
        .unwrap();

    n.server
        .put(&format!("/api/v1/admin/articles/{}", id))
        .authorization_bearer(&n.author)
        .json(&json!({ "content": "Primer párrafo.\n\nOtro párrafo." }))
        .await
        .assert_status_ok();

    let versions = n
        .server
        .get(&format!("/api/v1/admin/articles/{}/versions", id))
        .authorization_bearer(&n.author)
        .await
        .json::<Value>();
    assert_eq!(versions[0]["version_number"], 2);
    assert_eq!(versions[0]["is_current"], true);

    let comparison = n
        .server
        .get(&format!("/api/v1/admin/articles/{}/versions/compare", id))
        .add_query_param("from", 1)
        .add_query_param("to", 2)
        .authorization_bearer(&n.author)
        .await
        .json::<Value>();
    assert_eq!(comparison["lines_added"], 1);
    assert_eq!(comparison["lines_removed"], 1);

    let restored = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/versions/1/restore", id))
        .authorization_bearer(&n.author)
        .await
        .json::<Value>();
    assert_eq!(restored["current_version"], 3);
    assert_eq!(restored["content"], "Primer párrafo.\n\nSegundo párrafo.");

    n.server
        .get(&format!("/api/v1/admin/articles/{}/versions/9", id))
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_editorial_comments_and_publish_gate() {
    let mut config = Config::default();
    config.editorial.block_publish_with_open_comments = true;
    let n = newsroom_with(config).await;

    let id = create_draft(&n, "Elecciones municipales").await["id"]
        .as_i64()
        .unwrap();

    let comment = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/comments", id))
        .authorization_bearer(&n.editor)
        .json(&json!({ "body": "¿Fuente de la encuesta?" }))
        .await;
    comment.assert_status(StatusCode::CREATED);
    let comment_id = comment.json::<Value>()["id"].as_i64().unwrap();

    n.server
        .post(&format!("/api/v1/admin/articles/{}/comments", id))
        .authorization_bearer(&n.author)
        .json(&json!({ "body": "Gallup, enero", "parent_id": comment_id }))
        .await
        .assert_status(StatusCode::CREATED);

    let listing = n
        .server
        .get(&format!("/api/v1/admin/articles/{}/comments", id))
        .authorization_bearer(&n.author)
        .await
        .json::<Value>();
    assert_eq!(listing["unresolved"], 1);
    assert_eq!(listing["threads"][0]["replies"][0]["author_username"], "cronista");

    act(&n, &n.author, id, "submit", None).await;
    act(&n, &n.editor, id, "approve", None).await;

    let blocked = n
        .server
        .post(&format!("/api/v1/admin/articles/{}/publish", id))
        .authorization_bearer(&n.editor)
        .await;
    blocked.assert_status(StatusCode::CONFLICT);
    assert_eq!(blocked.json::<Value>()["error"]["details"]["unresolved_comments"], 1);

    n.server
        .post(&format!("/api/v1/admin/comments/{}/resolve", comment_id))
        .authorization_bearer(&n.editor)
        .await
        .assert_status_ok();

    act(&n, &n.editor, id, "publish", None).await;
}

#[tokio::test]
async fn test_audit_log_is_admin_only() {
    let n = newsroom().await;
    let id = create_draft(&n, "Precio de la gasolina").await["id"]
        .as_i64()
        .unwrap();
    act(&n, &n.author, id, "submit", None).await;

    n.server
        .get("/api/v1/admin/audit-logs")
        .authorization_bearer(&n.editor)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let logs = n
        .server
        .get("/api/v1/admin/audit-logs")
        .add_query_param("entity_type", "article")
        .add_query_param("entity_id", id)
        .authorization_bearer(&n.admin)
        .await
        .json::<Value>();
    assert_eq!(logs["total"], 2);
    assert_eq!(logs["items"][0]["action"], "article.submit");
    assert_eq!(logs["items"][1]["action"], "article.create");
}

#[tokio::test]
async fn test_deactivated_user_loses_session() {
    let n = newsroom().await;
    let users = n
        .server
        .get("/api/v1/admin/users")
        .authorization_bearer(&n.admin)
        .await
        .json::<Value>();
    let author_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "cronista")
        .and_then(|u| u["id"].as_i64())
        .unwrap();

    n.server
        .put(&format!("/api/v1/admin/users/{}", author_id))
        .authorization_bearer(&n.admin)
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    n.server
        .get("/api/v1/auth/me")
        .authorization_bearer(&n.author)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_taxonomy_and_unknown_route() {
    let server = server_with(Config::default()).await;

    let provinces = server.get("/api/v1/provinces").await.json::<Value>();
    assert_eq!(provinces.as_array().map(Vec::len), Some(32));

    let categories = server.get("/api/v1/categories").await.json::<Value>();
    assert!(!categories.as_array().unwrap().is_empty());

    let response = server.get("/api/v1/no-existe").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response.json::<Value>()), "NOT_FOUND");
}
