//! Handlers for the content calendar.
//!
//! Property names are detected per request from the live schema, so renaming
//! a column in Notion needs no redeploy.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use lookbook_core::error::CoreError;
use lookbook_core::properties::{date_value, file_value, text_value, PropertiesBuilder};
use lookbook_core::records::CalendarItem;
use lookbook_core::schema::{detect_keys, Role, CALENDAR_RULES};
use lookbook_notion::CollectionKind;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub items: Vec<CalendarItem>,
    pub platform_options: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCalendarEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Parse a `YYYY-MM-DD` day, normalising it for the Notion filter.
fn parse_day(value: &str) -> AppResult<String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|day| day.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{value}', expected YYYY-MM-DD")))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Core(CoreError::Validation(format!("{field} is required"))))
}

/// GET /api/content-calendar
///
/// List calendar entries, optionally only those published on `?date=`.
/// A date filter against a schema without a date property yields no items.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> AppResult<impl IntoResponse> {
    let day = params
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(parse_day)
        .transpose()?;

    let calendar = state.notion.collection(CollectionKind::ContentCalendar)?;
    let schema = calendar.schema().await?;
    let keys = detect_keys(&schema, &CALENDAR_RULES);

    let platform_options = keys
        .key(Role::Platform)
        .map(|name| schema.options_for(name).to_vec())
        .unwrap_or_default();

    let rows = match (&day, keys.key(Role::Date)) {
        (Some(day), Some(date_key)) => {
            let filter = json!({ "property": date_key, "date": { "equals": day } });
            calendar.query(Some(filter)).await?
        }
        (Some(day), None) => {
            tracing::debug!(%day, "Calendar schema has no date property; nothing matches");
            Vec::new()
        }
        (None, _) => calendar.query(None).await?,
    };

    let items: Vec<CalendarItem> = rows
        .iter()
        .map(|row| CalendarItem::from_record(row, &keys))
        .collect();

    tracing::info!(count = items.len(), date = day.as_deref(), "Listed calendar entries");

    Ok(Json(CalendarResponse {
        items,
        platform_options,
    }))
}

/// POST /api/content-calendar
///
/// Schedule a post. Fails with 400 before touching Notion when a field is
/// missing or the schema lacks a date, platform or files property.
pub async fn create_entry(
    State(state): State<AppState>,
    body: Result<Json<CreateCalendarEntry>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = body?;

    let day = parse_day(required(&input.publish_date, "publishDate")?)?;
    let platform = required(&input.platform, "platform")?;
    let image_url = required(&input.image_url, "imageUrl")?;
    let title = input.title.as_deref().map(str::trim).unwrap_or_default();

    let calendar = state.notion.collection(CollectionKind::ContentCalendar)?;
    let schema = calendar.schema().await?;
    let keys = detect_keys(&schema, &CALENDAR_RULES);

    let date_prop = keys.require(Role::Date)?;
    let platform_prop = keys.require(Role::Platform)?;
    let files_prop = keys.require(Role::Files)?;

    let mut properties = PropertiesBuilder::new();
    if let Some(title_prop) = keys.property(Role::Title) {
        properties.insert(title_prop, text_value(title_prop, title)?);
    }
    properties
        .insert(date_prop, date_value(date_prop, &day)?)
        .insert(platform_prop, text_value(platform_prop, platform)?)
        .insert(files_prop, file_value(files_prop, title, image_url)?);

    calendar.create(properties.build()).await?;

    tracing::info!(%day, platform, "Calendar entry created");

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_day_accepts_iso_dates() {
        assert_eq!(parse_day(" 2024-03-09 ").unwrap(), "2024-03-09");
    }

    #[test]
    fn parse_day_rejects_other_shapes() {
        assert_matches!(parse_day("09/03/2024"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_day("2024-02-30"), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn required_rejects_blank() {
        assert_matches!(
            required(&Some("  ".into()), "platform"),
            Err(AppError::Core(CoreError::Validation(msg))) if msg == "platform is required"
        );
        assert_eq!(required(&Some(" x ".into()), "platform").unwrap(), "x");
    }
}
