//! Integration tests for the content calendar endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use lookbook_notion::testing::FakeNotion;
use lookbook_notion::CollectionKind;
use serde_json::{json, Value};

fn entry(id: &str, day: &str, platform: &str) -> Value {
    json!({
        "id": id,
        "properties": {
            "Caption": { "type": "title", "title": [{ "plain_text": id }] },
            "Publish Date": { "type": "date", "date": { "start": day } },
            "Platform": { "type": "select", "select": { "name": platform } },
            "Media": { "type": "files", "files": [] }
        }
    })
}

fn calendar_schema() -> Value {
    json!({
        "Caption": { "type": "title", "title": {} },
        "Created": { "type": "date", "date": {} },
        "Publish Date": { "type": "date", "date": {} },
        "Platform": {
            "type": "select",
            "select": { "options": [{ "name": "Instagram" }, { "name": "TikTok" }] }
        },
        "Media": { "type": "files", "files": {} }
    })
}

// ---------------------------------------------------------------------------
// Test: date filter uses the publish date property
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_filters_by_publish_date() {
    let fake = FakeNotion::start().await;
    fake.add_data_source(
        "cal",
        calendar_schema(),
        vec![
            entry("first", "2024-05-01", "Instagram"),
            entry("second", "2024-05-02", "TikTok"),
        ],
    );
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = get(app, "/api/content-calendar?date=2024-05-02").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["items"],
        json!([{
            "id": "second",
            "title": "second",
            "date": "2024-05-02",
            "platform": "TikTok",
            "images": []
        }])
    );
    assert_eq!(json["platformOptions"], json!(["Instagram", "TikTok"]));
}

// ---------------------------------------------------------------------------
// Test: without a date every entry is returned
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_without_date_returns_everything() {
    let fake = FakeNotion::start().await;
    fake.add_data_source(
        "cal",
        calendar_schema(),
        vec![entry("a", "2024-05-01", "Instagram"), entry("b", "2024-06-01", "TikTok")],
    );
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = get(app, "/api/content-calendar").await;

    assert_eq!(body_json(response).await["items"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: a date filter against a schema with no date property matches nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn date_filter_without_date_property_returns_empty() {
    let fake = FakeNotion::start().await;
    fake.add_data_source(
        "cal",
        json!({ "Caption": { "type": "title", "title": {} } }),
        vec![json!({ "id": "a", "properties": {} })],
    );
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = get(app, "/api/content-calendar?date=2024-05-01").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "items": [], "platformOptions": [] })
    );
    assert_eq!(fake.request_count("POST /v1/data_sources/cal/query"), 0);
}

// ---------------------------------------------------------------------------
// Test: malformed dates are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_date_returns_400() {
    let fake = FakeNotion::start().await;
    fake.add_data_source("cal", calendar_schema(), vec![]);
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = get(app, "/api/content-calendar?date=May%201st").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// ---------------------------------------------------------------------------
// Test: create writes date, platform and image through detected properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_entry_writes_detected_properties() {
    let fake = FakeNotion::start().await;
    fake.add_data_source("cal", calendar_schema(), vec![]);
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = post_json(
        app,
        "/api/content-calendar",
        json!({
            "title": "Launch",
            "publishDate": "2024-07-04",
            "platform": "tiktok",
            "imageUrl": "https://cdn/launch.png"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));

    let props = &fake.created_pages()[0]["properties"];
    assert_eq!(props["Publish Date"]["date"]["start"], "2024-07-04");
    assert!(props.get("Created").is_none());
    assert_eq!(props["Platform"]["select"]["name"], "TikTok");
    assert_eq!(props["Media"]["files"][0]["external"]["url"], "https://cdn/launch.png");
    assert_eq!(props["Caption"]["title"][0]["text"]["content"], "Launch");
}

// ---------------------------------------------------------------------------
// Test: create with missing fields is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_entry_missing_fields_returns_400() {
    let fake = FakeNotion::start().await;
    fake.add_data_source("cal", calendar_schema(), vec![]);
    let app = common::build_test_app(&fake, &[(CollectionKind::ContentCalendar, "cal")]);

    let response = post_json(
        app,
        "/api/content-calendar",
        json!({ "publishDate": "2024-07-04", "imageUrl": "https://cdn/x.png" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "platform is required");
    assert!(fake.created_pages().is_empty());
}
