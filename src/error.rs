use thiserror::Error;

/// Library error type for storage proxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Required external configuration is absent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider call failed or returned an unexpected shape.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The provider does not know the requested file.
    #[error("file not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ProxyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Config(format!("invalid service account key: {err}"))
    }
}
