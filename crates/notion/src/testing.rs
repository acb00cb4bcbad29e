//! In-process fake of the Notion API (and a generic image host) for tests.
//!
//! Serves the subset of endpoints [`NotionApi`](crate::api::NotionApi) calls,
//! backed by in-memory data sources, and records every request so tests can
//! assert on call counts and created pages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// API key the fake accepts.
pub const FAKE_API_KEY: &str = "secret_test";

#[derive(Default)]
struct FakeState {
    data_sources: HashMap<String, FakeDataSource>,
    databases: HashMap<String, Vec<String>>,
    images: HashMap<String, FakeImage>,
    created: Vec<Value>,
    requests: Vec<String>,
}

struct FakeDataSource {
    properties: Value,
    rows: Vec<Value>,
}

struct FakeImage {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

type Shared = Arc<Mutex<FakeState>>;

/// A running fake server. The task stops when the value is dropped.
pub struct FakeNotion {
    state: Shared,
    url: String,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for FakeNotion {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeNotion {
    /// Bind to an ephemeral local port and start serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/v1/data_sources/{id}/query", post(query_data_source))
            .route("/v1/data_sources/{id}", get(retrieve_data_source))
            .route("/v1/databases/{id}", get(retrieve_database))
            .route("/v1/pages", post(create_page))
            .route("/images/{name}", get(serve_image))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake notion listener");
        let addr = listener.local_addr().expect("fake notion local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake notion server");
        });

        Self {
            state,
            url: format!("http://{addr}"),
            task,
        }
    }

    /// Base URL to configure as the Notion API origin.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register a data source. `properties` is the Notion `properties`
    /// schema object; `rows` are page objects returned by queries.
    pub fn add_data_source(&self, id: &str, properties: Value, rows: Vec<Value>) {
        self.lock()
            .data_sources
            .insert(id.to_string(), FakeDataSource { properties, rows });
    }

    /// Register a database containing the given data sources.
    pub fn add_database(&self, id: &str, data_source_ids: &[&str]) {
        self.lock().databases.insert(
            id.to_string(),
            data_source_ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Serve `body` at `/images/{name}`.
    pub fn add_image(&self, name: &str, status: u16, content_type: Option<&str>, body: Vec<u8>) {
        self.lock().images.insert(
            name.to_string(),
            FakeImage {
                status,
                content_type: content_type.map(str::to_string),
                body,
            },
        );
    }

    /// Bodies of every successful create-page call.
    pub fn created_pages(&self) -> Vec<Value> {
        self.lock().created.clone()
    }

    /// Number of recorded requests whose `"METHOD /path"` starts with `prefix`.
    pub fn request_count(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake notion state poisoned")
    }
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": format!("Could not find {what}"),
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FAKE_API_KEY}"))
        && headers.contains_key("notion-version")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "object": "error", "status": 401, "code": "unauthorized" })),
    )
        .into_response()
}

/// Keep rows whose date property starts with `filter.date.equals`.
fn matches_filter(row: &Value, filter: Option<&Value>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let (Some(property), Some(day)) = (
        filter.get("property").and_then(Value::as_str),
        filter
            .get("date")
            .and_then(|d| d.get("equals"))
            .and_then(Value::as_str),
    ) else {
        return true;
    };
    row.get("properties")
        .and_then(|p| p.get(property))
        .and_then(|p| p.get("date"))
        .and_then(|d| d.get("start"))
        .and_then(Value::as_str)
        .is_some_and(|start| start.starts_with(day))
}

async fn query_data_source(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("fake notion state poisoned");
    state.requests.push(format!("POST /v1/data_sources/{id}/query"));
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(source) = state.data_sources.get(&id) else {
        return not_found(&format!("data source {id}"));
    };

    let matching: Vec<&Value> = source
        .rows
        .iter()
        .filter(|row| matches_filter(row, body.get("filter")))
        .collect();
    let start: usize = body
        .get("start_cursor")
        .and_then(Value::as_str)
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    let page_size = body.get("page_size").and_then(Value::as_u64).unwrap_or(100) as usize;
    let end = (start + page_size).min(matching.len());
    let has_more = end < matching.len();

    Json(json!({
        "object": "list",
        "results": &matching[start.min(end)..end],
        "has_more": has_more,
        "next_cursor": has_more.then(|| end.to_string()),
    }))
    .into_response()
}

async fn retrieve_data_source(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().expect("fake notion state poisoned");
    state.requests.push(format!("GET /v1/data_sources/{id}"));
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.data_sources.get(&id) {
        Some(source) => Json(json!({
            "object": "data_source",
            "id": id,
            "properties": source.properties,
        }))
        .into_response(),
        None => not_found(&format!("data source {id}")),
    }
}

async fn retrieve_database(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().expect("fake notion state poisoned");
    state.requests.push(format!("GET /v1/databases/{id}"));
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.databases.get(&id) {
        Some(sources) => {
            let data_sources: Vec<Value> = sources.iter().map(|s| json!({ "id": s })).collect();
            Json(json!({ "object": "database", "id": id, "data_sources": data_sources }))
                .into_response()
        }
        None => not_found(&format!("database {id}")),
    }
}

async fn create_page(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("fake notion state poisoned");
    state.requests.push("POST /v1/pages".to_string());
    if !authorized(&headers) {
        return unauthorized();
    }
    let parent = body
        .get("parent")
        .and_then(|p| p.get("data_source_id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !state.data_sources.contains_key(&parent) {
        return not_found(&format!("data source {parent}"));
    }
    state.created.push(body);
    let id = format!("page-{}", state.created.len());
    Json(json!({ "object": "page", "id": id })).into_response()
}

async fn serve_image(State(state): State<Shared>, Path(name): Path<String>) -> Response {
    let mut state = state.lock().expect("fake notion state poisoned");
    state.requests.push(format!("GET /images/{name}"));
    let Some(image) = state.images.get(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let status = StatusCode::from_u16(image.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, image.body.clone()).into_response();
    if let Some(content_type) = &image.content_type {
        if let Ok(value) = content_type.parse::<axum::http::HeaderValue>() {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    } else {
        response.headers_mut().remove(header::CONTENT_TYPE);
    }
    response
}
