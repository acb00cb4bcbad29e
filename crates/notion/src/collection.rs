//! Per-collection gateway over the Notion API.
//!
//! [`NotionGateway`] is built once at startup from [`NotionConfig`] and
//! shared by every handler. Missing credentials do not fail construction;
//! they surface as configuration errors when a request touches the
//! affected collection.

use std::collections::HashMap;

use lookbook_core::schema::Schema;
use serde_json::Value;

use crate::api::NotionApi;
use crate::config::{CollectionKind, NotionConfig};
use crate::error::NotionError;
use crate::source::{DataSourceResolver, SourceState};

/// Entry point for all collection reads and writes.
pub struct NotionGateway {
    api: Option<NotionApi>,
    collections: HashMap<CollectionKind, DataSourceResolver>,
}

impl NotionGateway {
    pub fn new(client: reqwest::Client, config: &NotionConfig) -> Self {
        let api = config
            .api_key
            .clone()
            .map(|key| NotionApi::with_client(client, config.api_url.clone(), key));

        let collections = config
            .database_ids
            .iter()
            .map(|(kind, id)| (*kind, DataSourceResolver::new(id.clone())))
            .collect();

        Self { api, collections }
    }

    /// Borrow a collection, failing with a configuration error when the API
    /// key or the collection's database id is missing.
    pub fn collection(&self, kind: CollectionKind) -> Result<Collection<'_>, NotionError> {
        let api = self.api.as_ref().ok_or_else(|| {
            NotionError::Configuration("NOTION_API_KEY is not configured".to_string())
        })?;
        let resolver = self.collections.get(&kind).ok_or_else(|| {
            NotionError::Configuration(format!(
                "{} is not configured (needed by {kind})",
                kind.env_var()
            ))
        })?;
        Ok(Collection {
            kind,
            api,
            resolver,
        })
    }
}

/// A configured collection bound to the shared client.
pub struct Collection<'a> {
    kind: CollectionKind,
    api: &'a NotionApi,
    resolver: &'a DataSourceResolver,
}

impl Collection<'_> {
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn source_state(&self) -> SourceState {
        self.resolver.state()
    }

    /// All rows matching `filter` (all rows when `None`), newest first.
    pub async fn query(&self, filter: Option<Value>) -> Result<Vec<Value>, NotionError> {
        let sorts = serde_json::json!([{ "timestamp": "created_time", "direction": "descending" }]);
        let (api, filter, sorts) = (self.api, filter.as_ref(), &sorts);
        let rows = self
            .resolver
            .with_source(api, move |id| async move {
                api.query_data_source(&id, filter, Some(sorts)).await
            })
            .await?;

        tracing::debug!(collection = %self.kind, rows = rows.len(), "Queried Notion collection");
        Ok(rows)
    }

    /// Fetch the current property schema. Never cached, so schema edits in
    /// Notion take effect on the next write.
    pub async fn schema(&self) -> Result<Schema, NotionError> {
        let api = self.api;
        let source = self
            .resolver
            .with_source(api, move |id| async move { api.retrieve_data_source(&id).await })
            .await?;
        Ok(Schema::from_notion(&source))
    }

    /// Create one row with pre-built property values.
    pub async fn create(&self, properties: Value) -> Result<(), NotionError> {
        if !self.kind.is_writable() {
            return Err(NotionError::ReadOnly(self.kind.as_str()));
        }

        let (api, properties) = (self.api, &properties);
        let page = self
            .resolver
            .with_source(api, move |id| async move { api.create_page(&id, properties).await })
            .await?;

        tracing::info!(
            collection = %self.kind,
            page_id = page.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "Created Notion page",
        );
        Ok(())
    }
}
