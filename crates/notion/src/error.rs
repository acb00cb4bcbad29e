use lookbook_core::error::CoreError;

/// Errors from the Notion client layer and the image relay.
#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    /// A credential or database id is missing.
    #[error("{0}")]
    Configuration(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Notion returned a non-2xx status code.
    #[error("Notion API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Neither the configured id nor the database metadata yielded a data
    /// source to query.
    #[error("Could not resolve data source for database {0}")]
    UnresolvedDataSource(String),

    /// The collection does not accept writes.
    #[error("Collection '{0}' is read-only")]
    ReadOnly(&'static str),

    /// The caller supplied an unusable image URL.
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    /// The image host answered with a non-2xx status code.
    #[error("Failed to fetch image (upstream status {status})")]
    ImageFetch { status: u16 },

    /// The image body exceeded the relay size cap.
    #[error("Image exceeds the {limit} byte relay limit")]
    ImageTooLarge { limit: u64 },
}

impl From<NotionError> for CoreError {
    fn from(err: NotionError) -> Self {
        match err {
            NotionError::Configuration(_) | NotionError::UnresolvedDataSource(_) => {
                CoreError::Configuration(err.to_string())
            }
            NotionError::InvalidUrl(_) => CoreError::Validation(err.to_string()),
            NotionError::ReadOnly(_) => CoreError::Internal(err.to_string()),
            NotionError::Request(_)
            | NotionError::Api { .. }
            | NotionError::ImageFetch { .. }
            | NotionError::ImageTooLarge { .. } => CoreError::Upstream(err.to_string()),
        }
    }
}
