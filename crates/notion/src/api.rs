//! REST client for the Notion HTTP endpoints.
//!
//! Wraps the handful of Notion calls the backend needs (data source query
//! and retrieval, database retrieval, page creation) using [`reqwest`].

use serde_json::{json, Value};

use crate::config::NOTION_VERSION;
use crate::error::NotionError;

/// Page size requested from query endpoints (Notion's maximum).
pub const PAGE_SIZE: u32 = 100;

/// Hard stop on followed pagination cursors.
const MAX_PAGES: usize = 50;

/// HTTP client for the Notion API.
#[derive(Clone)]
pub struct NotionApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl NotionApi {
    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// * `api_url` - API origin, e.g. `https://api.notion.com`.
    pub fn with_client(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Query every row of a data source, following pagination cursors.
    ///
    /// `filter` and `sorts` are passed through verbatim when present.
    pub async fn query_data_source(
        &self,
        data_source_id: &str,
        filter: Option<&Value>,
        sorts: Option<&Value>,
    ) -> Result<Vec<Value>, NotionError> {
        let url = format!("{}/v1/data_sources/{data_source_id}/query", self.api_url);
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(filter) = filter {
                body["filter"] = filter.clone();
            }
            if let Some(sorts) = sorts {
                body["sorts"] = sorts.clone();
            }
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self.request(reqwest::Method::POST, &url).json(&body).send().await?;
            let page: Value = Self::parse_response(response).await?;

            if let Some(rows) = page.get("results").and_then(Value::as_array) {
                results.extend(rows.iter().cloned());
            }

            let has_more = page.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                return Ok(results);
            }
        }

        tracing::warn!(
            data_source_id,
            rows = results.len(),
            "Stopped following Notion pagination after {MAX_PAGES} pages",
        );
        Ok(results)
    }

    /// Retrieve a data source object (carries the property schema).
    pub async fn retrieve_data_source(&self, data_source_id: &str) -> Result<Value, NotionError> {
        let url = format!("{}/v1/data_sources/{data_source_id}", self.api_url);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        Self::parse_response(response).await
    }

    /// Retrieve database metadata, including its `data_sources` list.
    pub async fn retrieve_database(&self, database_id: &str) -> Result<Value, NotionError> {
        let url = format!("{}/v1/databases/{database_id}", self.api_url);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        Self::parse_response(response).await
    }

    /// Create a page (row) in a data source.
    pub async fn create_page(
        &self,
        data_source_id: &str,
        properties: &Value,
    ) -> Result<Value, NotionError> {
        let body = json!({
            "parent": { "type": "data_source_id", "data_source_id": data_source_id },
            "properties": properties,
        });
        let url = format!("{}/v1/pages", self.api_url);
        let response = self.request(reqwest::Method::POST, &url).json(&body).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`NotionError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, NotionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, NotionError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
