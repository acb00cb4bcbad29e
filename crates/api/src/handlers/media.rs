//! Handlers for the outfit and reference-image collections.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use lookbook_core::error::CoreError;
use lookbook_core::properties::{file_value, text_value, PropertiesBuilder};
use lookbook_core::records::MediaItem;
use lookbook_core::schema::{detect_keys, Role, MEDIA_RULES};
use lookbook_notion::CollectionKind;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// Reference image kinds the front end offers.
const REFERENCE_TYPES: &[&str] = &["Photo", "Reel"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReferenceImage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Canonical spelling of a reference type, matched case-insensitively.
fn reference_type(value: &str) -> Result<&'static str, CoreError> {
    REFERENCE_TYPES
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "type must be one of {}",
                REFERENCE_TYPES.join(", ").to_lowercase()
            ))
        })
}

async fn list_media(state: &AppState, kind: CollectionKind) -> AppResult<Vec<MediaItem>> {
    let rows = state.notion.collection(kind)?.query(None).await?;
    let items: Vec<MediaItem> = rows.iter().map(MediaItem::from_record).collect();
    tracing::info!(collection = %kind, count = items.len(), "Listed media");
    Ok(items)
}

/// GET /api/outfits
pub async fn list_outfits(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let outfits = list_media(&state, CollectionKind::Outfits).await?;
    Ok(Json(json!({ "outfits": outfits })))
}

/// GET /api/reference-images
pub async fn list_reference_images(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let images = list_media(&state, CollectionKind::ReferenceImages).await?;
    Ok(Json(json!({ "referenceImages": images })))
}

/// POST /api/reference-images
///
/// Store a picked image as a new reference. The title and files properties
/// are required; the type is written only when the schema has a category
/// property.
pub async fn create_reference_image(
    State(state): State<AppState>,
    body: Result<Json<CreateReferenceImage>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = body?;

    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let (Some(name), Some(image_url), Some(kind)) = (
        non_empty(&input.name),
        non_empty(&input.image_url),
        non_empty(&input.kind),
    ) else {
        return Err(CoreError::Validation("name, imageUrl and type are required".into()).into());
    };
    let kind = reference_type(&kind)?;

    let references = state.notion.collection(CollectionKind::ReferenceImages)?;
    let schema = references.schema().await?;
    let keys = detect_keys(&schema, &MEDIA_RULES);

    let title_prop = keys.require(Role::Title)?;
    let files_prop = keys.require(Role::Files)?;

    let mut properties = PropertiesBuilder::new();
    properties
        .insert(title_prop, text_value(title_prop, &name)?)
        .insert(files_prop, file_value(files_prop, &name, &image_url)?);
    if let Some(category_prop) = keys.property(Role::Category) {
        properties.insert(category_prop, text_value(category_prop, kind)?);
    }

    references.create(properties.build()).await?;

    tracing::info!(%name, kind, "Reference image created");

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_type_is_case_insensitive() {
        assert_eq!(reference_type("photo").unwrap(), "Photo");
        assert_eq!(reference_type(" REEL ").unwrap(), "Reel");
    }

    #[test]
    fn unknown_reference_type_rejected() {
        let err = reference_type("story").unwrap_err();
        assert!(err.to_string().contains("photo, reel"));
    }
}
