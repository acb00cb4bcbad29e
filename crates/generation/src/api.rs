//! REST client for the image-generation provider.
//!
//! Submits a model-specific payload and fetches task status using
//! [`reqwest`]. Response interpretation lives in
//! [`lookbook_core::task_response`].

use async_trait::async_trait;
use lookbook_core::error::CoreError;
use serde_json::Value;

use crate::poller::StatusSource;

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationApiError {
    /// The HTTP request itself failed, or the body was not JSON.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<GenerationApiError> for CoreError {
    fn from(err: GenerationApiError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Everything the job tracker needs from a provider.
#[async_trait]
pub trait GenerationBackend: StatusSource {
    /// Submit `payload` to `model`; returns the raw provider response.
    async fn submit(&self, model: &str, payload: &Value) -> Result<Value, GenerationApiError>;

    /// Status URL for a task id when the provider did not return one.
    fn result_url(&self, task_id: &str) -> String;
}

/// HTTP client for the generation provider.
#[derive(Clone)]
pub struct GenerationApi {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GenerationApi {
    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// * `api_base` - REST base, e.g. `https://api.wavespeed.ai/api/v3`.
    pub fn with_client(client: reqwest::Client, api_base: String, api_key: String) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`GenerationApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, GenerationApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl StatusSource for GenerationApi {
    /// `GET {url}` with the bearer key.
    async fn fetch_status(&self, url: &str) -> Result<Value, GenerationApiError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl GenerationBackend for GenerationApi {
    /// `POST {api_base}/{model}` with the payload as JSON body.
    async fn submit(&self, model: &str, payload: &Value) -> Result<Value, GenerationApiError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, model.trim_matches('/')))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    fn result_url(&self, task_id: &str) -> String {
        format!("{}/predictions/{task_id}/result", self.api_base)
    }
}
