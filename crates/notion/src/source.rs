//! Database -> data source resolution.
//!
//! Notion's current API queries *data sources*, while users configure the
//! id of the *database* that contains them. A configured id may already be a
//! data source id, or may need resolving through the database metadata.
//!
//! [`DataSourceResolver`] is a two-state machine:
//!
//! ```text
//! Unresolved --(direct call succeeds)------------------> Resolved(configured id)
//! Unresolved --(direct call fails, metadata lookup)----> Resolved(data_sources[0].id)
//! ```
//!
//! The transition happens at most once per process. Concurrent callers that
//! race on the first resolution share the same pending lookup.

use std::future::Future;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::api::NotionApi;
use crate::error::NotionError;

/// Observable state of a [`DataSourceResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    Unresolved,
    Resolved(String),
}

/// Resolves and caches the data source behind one configured database id.
pub struct DataSourceResolver {
    database_id: String,
    resolved: OnceCell<String>,
}

impl DataSourceResolver {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            resolved: OnceCell::new(),
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn state(&self) -> SourceState {
        match self.resolved.get() {
            Some(id) => SourceState::Resolved(id.clone()),
            None => SourceState::Unresolved,
        }
    }

    /// Run `op` against the data source id.
    ///
    /// Once resolved, `op` runs once with the cached id. While unresolved,
    /// `op` is first tried with the configured id; on failure the id is
    /// resolved through the database metadata and `op` is retried.
    pub async fn with_source<T, F, Fut>(&self, api: &NotionApi, op: F) -> Result<T, NotionError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, NotionError>>,
    {
        if let Some(id) = self.resolved.get() {
            return op(id.clone()).await;
        }

        match op(self.database_id.clone()).await {
            Ok(value) => {
                // Another caller may have resolved meanwhile; both values work.
                let _ = self.resolved.set(self.database_id.clone());
                Ok(value)
            }
            Err(direct_err) => {
                tracing::debug!(
                    database_id = %self.database_id,
                    error = %direct_err,
                    "Direct data source call failed, resolving through database metadata",
                );
                let id = self.resolve(api).await?;
                op(id.to_string()).await
            }
        }
    }

    /// Resolve through the database metadata, sharing the lookup between
    /// concurrent callers.
    async fn resolve(&self, api: &NotionApi) -> Result<&str, NotionError> {
        let id = self
            .resolved
            .get_or_try_init(|| async {
                let database = api.retrieve_database(&self.database_id).await?;
                let id = first_data_source_id(&database)
                    .ok_or_else(|| NotionError::UnresolvedDataSource(self.database_id.clone()))?;
                tracing::info!(
                    database_id = %self.database_id,
                    data_source_id = %id,
                    "Resolved Notion data source",
                );
                Ok::<_, NotionError>(id)
            })
            .await?;
        Ok(id.as_str())
    }
}

/// First `data_sources[].id` of a database object.
pub fn first_data_source_id(database: &Value) -> Option<String> {
    database
        .get("data_sources")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|ds| ds.get("id").and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_data_source_id_takes_first_entry() {
        let db = json!({ "data_sources": [{ "id": "ds-1", "name": "Main" }, { "id": "ds-2" }] });
        assert_eq!(first_data_source_id(&db).as_deref(), Some("ds-1"));
    }

    #[test]
    fn first_data_source_id_missing_or_empty() {
        assert_eq!(first_data_source_id(&json!({})), None);
        assert_eq!(first_data_source_id(&json!({ "data_sources": [] })), None);
        assert_eq!(first_data_source_id(&json!({ "data_sources": [{ "id": "" }] })), None);
    }

    #[test]
    fn new_resolver_is_unresolved() {
        let resolver = DataSourceResolver::new("db-1");
        assert_eq!(resolver.state(), SourceState::Unresolved);
        assert_eq!(resolver.database_id(), "db-1");
    }
}
