use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API response error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Remote fetch of {operation} failed after {attempts} attempt(s): {source}")]
    RemoteFetch {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<FeedError>,
    },

    #[error("Malformed {kind} record: {message}")]
    MalformedRecord { kind: &'static str, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl FeedError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::HttpError(e) => !e.is_builder() && !e.is_decode(),
            FeedError::ApiError { status, .. } => *status == 429 || *status >= 500,
            FeedError::RemoteFetch { source, .. } => source.is_transient(),
            FeedError::JsonError(_)
            | FeedError::MalformedRecord { .. }
            | FeedError::ConfigError(_) => false,
        }
    }

    pub(crate) fn malformed(kind: &'static str, message: impl Into<String>) -> Self {
        FeedError::MalformedRecord {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
