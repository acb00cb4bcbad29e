//! Extractors turning raw Notion page objects into flat view records.
//!
//! Every extractor is total: a missing or malformed property yields a
//! default (`"Untitled"`, an empty list, `None`, `false`) instead of an
//! error, because user schemas are free-form and partially filled.

use serde::Serialize;
use serde_json::Value;

use crate::schema::{Role, SchemaKeyMap};

/// Title used when a record has no usable title text.
pub const UNTITLED: &str = "Untitled";

/// Text values recognised as an affirmative flag.
const TRUTHY_TEXT: &[&str] = &["yes", "true", "1"];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

fn properties(record: &Value) -> impl Iterator<Item = (&String, &Value)> {
    record
        .get("properties")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter())
}

fn property<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    record.get("properties")?.get(name)
}

fn property_type(prop: &Value) -> Option<&str> {
    prop.get("type").and_then(Value::as_str)
}

/// Concatenate the `plain_text` of a rich-text array, falling back to
/// `text.content` for payloads that were built rather than fetched.
fn plain_text(fragments: Option<&Value>) -> String {
    fragments
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("plain_text")
                        .or_else(|| item.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn option_name(option: Option<&Value>) -> Option<String> {
    option
        .and_then(|o| o.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Plain-text rendering of a single property value, whatever its type.
///
/// Multi-select values are joined with `", "`. Returns `None` when the
/// property has no textual representation or is empty.
pub fn property_text(prop: &Value) -> Option<String> {
    let kind = property_type(prop)?;
    let typed = match kind {
        "title" | "rich_text" => Some(plain_text(prop.get(kind))),
        "select" | "status" => option_name(prop.get(kind)),
        "multi_select" => prop.get(kind).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        }),
        "url" | "email" | "phone_number" => {
            prop.get(kind).and_then(Value::as_str).map(str::to_string)
        }
        "date" => prop
            .get("date")
            .and_then(|d| d.get("start"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    // The simplified shape `{type, text}` is accepted for hand-built values.
    let text = typed
        .filter(|t| !t.trim().is_empty())
        .or_else(|| prop.get("text").and_then(Value::as_str).map(str::to_string))?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Interpret a property as a yes/no flag.
///
/// Checkboxes are read directly. Select, status and text properties count as
/// true when their trimmed value is `yes`, `true` or `1`, case-insensitive.
pub fn property_flag(prop: &Value) -> bool {
    match property_type(prop) {
        Some("checkbox") => prop.get("checkbox").and_then(Value::as_bool).unwrap_or(false),
        Some(_) => {
            let text = property_text(prop)
                .or_else(|| option_name(Some(prop)))
                .unwrap_or_default();
            let text = text.trim().to_ascii_lowercase();
            TRUTHY_TEXT.contains(&text.as_str())
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Record-level extractors
// ---------------------------------------------------------------------------

/// The record's page id, empty when absent.
pub fn record_id(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Text of the first title-typed property, or [`UNTITLED`].
pub fn extract_title(record: &Value) -> String {
    properties(record)
        .find(|(_, prop)| property_type(prop) == Some("title"))
        .and_then(|(_, prop)| property_text(prop))
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Every file URL across all files-typed properties, in declared order.
///
/// Hosted files carry `file.url`, linked files `external.url`; entries with
/// neither are dropped.
pub fn extract_images(record: &Value) -> Vec<String> {
    properties(record)
        .filter(|(_, prop)| property_type(prop) == Some("files"))
        .filter_map(|(_, prop)| prop.get("files").and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| {
            entry
                .get("file")
                .and_then(|f| f.get("url"))
                .or_else(|| entry.get("external").and_then(|f| f.get("url")))
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Value of the first select or status property, else the first name of the
/// first multi-select property.
pub fn extract_category(record: &Value) -> Option<String> {
    properties(record)
        .find_map(|(_, prop)| match property_type(prop) {
            Some(kind @ ("select" | "status")) => option_name(prop.get(kind)),
            _ => None,
        })
        .or_else(|| {
            properties(record).find_map(|(_, prop)| match property_type(prop) {
                Some("multi_select") => prop
                    .get("multi_select")
                    .and_then(Value::as_array)
                    .and_then(|items| option_name(items.first())),
                _ => None,
            })
        })
}

/// Text of the named property.
pub fn extract_text(record: &Value, name: &str) -> Option<String> {
    property(record, name).and_then(property_text)
}

/// Start date of the named date property.
pub fn extract_date(record: &Value, name: &str) -> Option<String> {
    property(record, name)
        .and_then(|prop| prop.get("date"))
        .and_then(|d| d.get("start"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Whether the record is flagged as a favourite through the named property.
pub fn extract_favourite(record: &Value, name: &str) -> bool {
    property(record, name).is_some_and(property_flag)
}

// ---------------------------------------------------------------------------
// View records
// ---------------------------------------------------------------------------

/// One content-calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarItem {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub platform: Option<String>,
    pub images: Vec<String>,
}

impl CalendarItem {
    pub fn from_record(record: &Value, keys: &SchemaKeyMap) -> Self {
        Self {
            id: record_id(record),
            title: extract_title(record),
            date: keys
                .key(Role::Date)
                .and_then(|name| extract_date(record, name)),
            platform: keys
                .key(Role::Platform)
                .and_then(|name| extract_text(record, name)),
            images: extract_images(record),
        }
    }
}

/// An outfit or reference image: a named set of pictures with a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub images: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl MediaItem {
    pub fn from_record(record: &Value) -> Self {
        Self {
            id: record_id(record),
            name: extract_title(record),
            images: extract_images(record),
            kind: extract_category(record),
        }
    }
}

/// A reusable prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptItem {
    pub id: String,
    pub title: String,
    pub prompt: String,
}

impl PromptItem {
    /// Build from a record; the prompt body comes from the mapped prompt
    /// property, else the first rich-text property.
    pub fn from_record(record: &Value, keys: &SchemaKeyMap) -> Self {
        let prompt = keys
            .key(Role::Prompt)
            .and_then(|name| extract_text(record, name))
            .or_else(|| {
                properties(record)
                    .find(|(_, prop)| property_type(prop) == Some("rich_text"))
                    .and_then(|(_, prop)| property_text(prop))
            })
            .unwrap_or_default();

        Self {
            id: record_id(record),
            title: extract_title(record),
            prompt,
        }
    }
}
