//! Error types for Fieldhand

use thiserror::Error;

/// Result type alias for Fieldhand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Fieldhand
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    /// Provider throttled the request (HTTP 429 / RESOURCE_EXHAUSTED).
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A tool rejected its input or found nothing to act on.
    #[error("Tool error: {0}")]
    Tool(String),

    /// An external collaborator (catalog, store, scheduler...) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the model gateway may retry after this error.
    pub fn is_transient_quota(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_quota_is_transient() {
        assert!(Error::QuotaExceeded("429".into()).is_transient_quota());
        assert!(!Error::Llm("500".into()).is_transient_quota());
        assert!(!Error::Collaborator("down".into()).is_transient_quota());
    }
}
