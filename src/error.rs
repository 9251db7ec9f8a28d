use std::time::Duration;
use thiserror::Error;

/// Failure talking to an external collaborator (quote, account or order provider)
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} not connected")]
    NotConfigured(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    /// Whether retrying the same request might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
