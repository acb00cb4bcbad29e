//! Server-side image relay.
//!
//! Browsers cannot read pixels from Notion-hosted files across origins, so
//! the front end asks the backend to download the file and hand it back as
//! a `data:` URL.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;

use crate::error::NotionError;

/// Content type used when the upstream response does not declare one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Downloads remote images and re-encodes them as data URLs.
#[derive(Clone)]
pub struct ImageProxy {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageProxy {
    pub fn new(client: reqwest::Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    /// Fetch `url` and return `data:{content-type};base64,{body}`.
    ///
    /// Only `http` and `https` URLs are accepted. Bodies larger than the
    /// configured cap are rejected, whether announced by `Content-Length`
    /// or discovered while reading.
    pub async fn fetch_data_url(&self, url: &str) -> Result<String, NotionError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| NotionError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NotionError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Image host returned an error");
            return Err(NotionError::ImageFetch {
                status: status.as_u16(),
            });
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(NotionError::ImageTooLarge {
                limit: self.max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(NotionError::ImageTooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url, bytes = body.len(), %content_type, "Relayed image");
        Ok(format!("data:{content_type};base64,{}", BASE64.encode(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNotion;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn relays_image_as_data_url() {
        let fake = FakeNotion::start().await;
        fake.add_image("a.png", 200, Some("image/png"), b"hello".to_vec());
        let proxy = ImageProxy::new(reqwest::Client::new(), 1024);

        let data_url = proxy
            .fetch_data_url(&format!("{}/images/a.png", fake.url()))
            .await
            .unwrap();

        assert_eq!(data_url, "data:image/png;base64,aGVsbG8=");
    }

    #[tokio::test]
    async fn missing_content_type_falls_back() {
        let fake = FakeNotion::start().await;
        fake.add_image("blob", 200, None, vec![1, 2, 3]);
        let proxy = ImageProxy::new(reqwest::Client::new(), 1024);

        let data_url = proxy
            .fetch_data_url(&format!("{}/images/blob", fake.url()))
            .await
            .unwrap();

        assert!(data_url.starts_with("data:application/octet-stream;base64,"));
    }

    #[tokio::test]
    async fn upstream_status_is_reported() {
        let fake = FakeNotion::start().await;
        fake.add_image("gone.png", 403, Some("text/plain"), b"expired".to_vec());
        let proxy = ImageProxy::new(reqwest::Client::new(), 1024);

        let err = proxy
            .fetch_data_url(&format!("{}/images/gone.png", fake.url()))
            .await
            .unwrap_err();

        assert_matches!(err, NotionError::ImageFetch { status: 403 });
    }

    #[tokio::test]
    async fn oversized_image_rejected() {
        let fake = FakeNotion::start().await;
        fake.add_image("big.png", 200, Some("image/png"), vec![0; 4096]);
        let proxy = ImageProxy::new(reqwest::Client::new(), 1024);

        let err = proxy
            .fetch_data_url(&format!("{}/images/big.png", fake.url()))
            .await
            .unwrap_err();

        assert_matches!(err, NotionError::ImageTooLarge { limit: 1024 });
    }

    #[tokio::test]
    async fn non_http_urls_rejected() {
        let proxy = ImageProxy::new(reqwest::Client::new(), 1024);

        assert_matches!(
            proxy.fetch_data_url("file:///etc/passwd").await,
            Err(NotionError::InvalidUrl(_))
        );
        assert_matches!(
            proxy.fetch_data_url("not a url").await,
            Err(NotionError::InvalidUrl(_))
        );
    }
}
