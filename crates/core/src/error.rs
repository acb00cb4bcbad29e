/// Domain error taxonomy shared by every crate in the workspace.
///
/// Client crates convert their transport errors into one of these variants
/// so the HTTP layer can map them to a status code in one place.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required credential or identifier is missing from the environment.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// An external API answered with a non-success status or an unusable body.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
