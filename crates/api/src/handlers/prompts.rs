//! Handlers for the prompt collections.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use lookbook_core::records::{extract_favourite, PromptItem};
use lookbook_core::schema::{detect_keys, Role, SchemaKeyMap, PROMPT_RULES};
use lookbook_notion::CollectionKind;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Rows and detected keys of a prompt collection. Schema and rows are
/// fetched concurrently.
async fn load(state: &AppState, kind: CollectionKind) -> AppResult<(Vec<Value>, SchemaKeyMap)> {
    let collection = state.notion.collection(kind)?;
    let (schema, rows) = tokio::join!(collection.schema(), collection.query(None));
    let keys = detect_keys(&schema?, &PROMPT_RULES);
    Ok((rows?, keys))
}

/// GET /api/prompts
///
/// Favourite prompts with a non-empty body. Without a favourite property
/// nothing is a favourite.
pub async fn list_favourite_prompts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let (rows, keys) = load(&state, CollectionKind::Prompts).await?;

    let prompts: Vec<PromptItem> = match keys.key(Role::Favourite) {
        Some(favourite) => rows
            .iter()
            .filter(|row| extract_favourite(row, favourite))
            .map(|row| PromptItem::from_record(row, &keys))
            .filter(|item| !item.prompt.trim().is_empty())
            .collect(),
        None => {
            tracing::warn!("Prompt schema has no favourite property");
            Vec::new()
        }
    };

    tracing::info!(total = rows.len(), count = prompts.len(), "Listed favourite prompts");

    Ok(Json(json!({ "prompts": prompts })))
}

/// GET /api/variation-prompts
///
/// Every variation prompt, newest first.
pub async fn list_variation_prompts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let (rows, keys) = load(&state, CollectionKind::VariationPrompts).await?;

    let prompts: Vec<PromptItem> = rows
        .iter()
        .map(|row| PromptItem::from_record(row, &keys))
        .collect();

    tracing::info!(count = prompts.len(), "Listed variation prompts");

    Ok(Json(json!({ "prompts": prompts })))
}
