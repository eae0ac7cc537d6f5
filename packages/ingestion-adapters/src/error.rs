use std::borrow::Cow;

use job_engine::{Categorizable, SafeErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("missing or invalid configuration: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transient network error: {0}")]
    Transient(#[source] fetch_client::FetchError),

    #[error("rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("request was cancelled")]
    Cancelled,
}

impl From<fetch_client::FetchError> for AdapterError {
    fn from(err: fetch_client::FetchError) -> Self {
        match err {
            fetch_client::FetchError::InvalidUrl { url } => {
                AdapterError::Config(format!("invalid url: {url}"))
            }
            fetch_client::FetchError::RateLimited { retry_after } => {
                AdapterError::RateLimited { retry_after }
            }
            fetch_client::FetchError::Cancelled => AdapterError::Cancelled,
            fetch_client::FetchError::ClientError { status } if status == 401 || status == 403 => {
                AdapterError::Auth(format!("status {status}"))
            }
            other => AdapterError::Transient(other),
        }
    }
}

impl Categorizable for AdapterError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            AdapterError::Config(_) => SafeErrorCategory::Config,
            AdapterError::Auth(_) => SafeErrorCategory::Auth,
            AdapterError::Transient(_) => SafeErrorCategory::Transient,
            AdapterError::RateLimited { .. } => SafeErrorCategory::RateLimited,
            AdapterError::Parse(_) => SafeErrorCategory::Parse,
            AdapterError::Cancelled => SafeErrorCategory::Cancelled,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            AdapterError::Config(_) => "adapter configuration is invalid".into(),
            AdapterError::Auth(_) => "authentication with the upstream source failed".into(),
            AdapterError::Transient(_) => "a transient network error occurred".into(),
            AdapterError::RateLimited { .. } => "rate limited by the upstream source".into(),
            AdapterError::Parse(_) => "failed to parse the upstream response".into(),
            AdapterError::Cancelled => "request was cancelled".into(),
        }
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
