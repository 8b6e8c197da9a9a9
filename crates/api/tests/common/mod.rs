#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use wedflex_api::config::ServerConfig;
use wedflex_api::router::build_app_router;
use wedflex_api::state::AppState;

/// A memory-mode application with its own upload directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _uploads: TempDir,
}

impl TestApp {
    /// A fresh router handle for one request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` in memory mode, storing uploads under `upload_dir`.
pub fn test_config(upload_dir: &str) -> ServerConfig {
    let upload_dir = upload_dir.to_string();
    ServerConfig::from_lookup(|key| match key {
        "HOST" => Some("127.0.0.1".into()),
        "PORT" => Some("0".into()),
        "JWT_SECRET" => Some("integration-test-secret".into()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        "UPLOAD_MAX_BYTES" => Some("1024".into()),
        _ => None,
    })
    .expect("test config should load")
}

/// Build the full application router with all middleware layers.
///
/// Sign-in links land in the outbox instead of being emailed.
pub async fn build_test_app() -> TestApp {
    let uploads = tempfile::tempdir().expect("tempdir");
    let config = test_config(uploads.path().to_str().expect("utf-8 temp path"));
    let state = AppState::initialise(config.clone())
        .await
        .expect("memory backend should start");
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        state,
        _uploads: uploads,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::GET, uri, Some(token)).body(Body::empty()).unwrap(),
    )
    .await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: Value,
    token: Option<&str>,
) -> Response<Body> {
    let request = request(method, uri, token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body, None).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    json_request(app, Method::POST, uri, body, Some(token)).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value, token: Option<&str>) -> Response<Body> {
    json_request(app, Method::PATCH, uri, body, token).await
}

/// POST with no body, as the wizard transitions are sent.
pub async fn post_empty(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(
        app,
        request(Method::POST, uri, token).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(
        app,
        request(Method::DELETE, uri, token).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: Vec<u8>,
    token: Option<&str>,
) -> Response<Body> {
    let request = request(Method::POST, uri, token)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Multipart body with a single `file` part.
pub fn multipart_file(file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "wedflex-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

/// Request a magic link and return the URL that was "emailed".
pub async fn request_link(app: &TestApp, email: &str, next: Option<&str>) -> String {
    let response = post_json(
        app.app(),
        "/api/auth/magic-link",
        serde_json::json!({ "email": email, "next": next }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let outbox = app.state.outbox.as_ref().expect("memory mode records links");
    outbox
        .last_link_for(email)
        .await
        .expect("a link should have been recorded")
        .to_string()
}

/// Open a link through the callback endpoint and return its JSON outcome.
pub async fn open_link(app: &TestApp, url: &str) -> Value {
    let response = post_json(
        app.app(),
        "/api/auth/callback",
        serde_json::json!({ "url": url }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Sign in through the magic-link flow and return the session JSON.
pub async fn sign_in_session(app: &TestApp, email: &str) -> Value {
    let link = request_link(app, email, None).await;
    let outcome = open_link(app, &link).await;
    assert_eq!(outcome["ok"], true, "callback should sign in: {outcome}");
    outcome["session"].clone()
}

/// Sign in and return just the access token.
pub async fn sign_in(app: &TestApp, email: &str) -> String {
    let session = sign_in_session(app, email).await;
    session["access_token"]
        .as_str()
        .expect("session carries an access token")
        .to_string()
}
