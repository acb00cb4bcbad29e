#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lookbook_generation::GenerationConfig;
use lookbook_notion::testing::{FakeNotion, FAKE_API_KEY};
use lookbook_notion::{CollectionKind, NotionConfig};
use tower::ServiceExt;

use lookbook_api::config::ServerConfig;
use lookbook_api::router::build_app_router;
use lookbook_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults and no provider access.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        notion: NotionConfig::default(),
        generation: GenerationConfig::default(),
    }
}

/// Point every listed collection at the fake Notion server.
pub fn notion_config(fake: &FakeNotion, ids: &[(CollectionKind, &str)]) -> NotionConfig {
    NotionConfig {
        api_key: Some(FAKE_API_KEY.to_string()),
        api_url: fake.url().to_string(),
        database_ids: ids.iter().map(|(k, id)| (*k, id.to_string())).collect(),
        ..Default::default()
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_app(config: ServerConfig) -> Router {
    let state = AppState::new(config.clone());
    build_app_router(state, &config)
}

/// Router whose collections live in `fake`.
pub fn build_test_app(fake: &FakeNotion, ids: &[(CollectionKind, &str)]) -> Router {
    let mut config = test_config();
    config.notion = notion_config(fake, ids);
    build_app(config)
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
