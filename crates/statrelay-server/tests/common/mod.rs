#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use statrelay_server::app;
use statrelay_server::state::AppState;
use statrelay_storage::memory::MemStorage;
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestContext {
    pub storage: Arc<MemStorage>,
    pub app: axum::Router,
}

pub fn build_test_context(sign_key: Option<&str>) -> TestContext {
    let storage = Arc::new(MemStorage::new());
    let state = AppState {
        storage: storage.clone(),
        db: None,
        sign_key: sign_key.map(Arc::from),
    };
    let app = app::build_http_app(state);
    TestContext { storage, app }
}

pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Vec<u8>>,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder
        .body(match body {
            Some(bytes) => Body::from(bytes),
            None => Body::empty(),
        })
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, String::from_utf8_lossy(&bytes).to_string())
}

pub async fn post(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    send(app, "POST", uri, None, &[]).await
}

pub async fn post_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, String) {
    send(
        app,
        "POST",
        uri,
        Some(body.to_string().into_bytes()),
        &[("Content-Type", "application/json")],
    )
    .await
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    send(app, "GET", uri, None, &[]).await
}
