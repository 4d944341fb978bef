//! Common test utilities for integration tests
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use directiva_server::app::{AppState, build_router};
use directiva_server::config::ServerConfig;
use directiva_server::users::UserStore;
use directiva_session::SessionStore;
use directiva_session_sqlite::SqliteSessionStore;
use directiva_tenancy::TenantRegistry;

/// A fully assembled application over temporary on-disk stores.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub session_store: Arc<dyn SessionStore>,
    // Held so the stores outlive the test
    pub dir: TempDir,
}

/// Build the application with one active user `tesorero` /
/// `semilla-maiz-2024`.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut config = ServerConfig::default();
    config.data_dir = dir.path().to_string_lossy().into_owned();

    let session_store: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::new(&config.session_store_path())
            .await
            .expect("session store"),
    );
    let registry = Arc::new(
        TenantRegistry::open(config.control_descriptor(), config.data_dir())
            .await
            .expect("registry"),
    );
    let users = UserStore::new(registry.default_handle().pool.clone());
    users.ensure_schema().await.expect("users schema");
    users
        .create_user("tesorero", "semilla-maiz-2024", true)
        .await
        .expect("seed user");

    let state = AppState {
        config: Arc::new(config),
        session_store: session_store.clone(),
        registry,
        users: Arc::new(users),
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        session_store,
        dir,
    }
}

/// Send a JSON request, optionally with a session cookie.
pub async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("directiva_session={}", cookie));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    router.clone().oneshot(request).await.unwrap()
}

/// Log in as the seeded user, returning the session cookie value.
pub async fn login(router: &Router) -> String {
    let response = request(
        router,
        "POST",
        "/api/login",
        Some(serde_json::json!({
            "username": "tesorero",
            "password": "semilla-maiz-2024",
        })),
        None,
    )
    .await;
    assert_eq!(response.status(), 200, "login should succeed");
    session_cookie_value(&response).expect("login should set the session cookie")
}

/// Extract the session key from a Set-Cookie header, if present.
pub fn session_cookie_value(response: &Response<Body>) -> Option<String> {
    let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let (name_value, _) = raw.split_once(';')?;
    let (name, value) = name_value.split_once('=')?;
    (name == "directiva_session" && !value.is_empty()).then(|| value.to_string())
}

/// Read the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response should be JSON")
}
