use thiserror::Error;

/// Errors returned by the Yelp Fusion client.
#[derive(Debug, Error)]
pub enum YelpError {
    /// HTTP 429 from the directory.
    #[error("rate limited by the Yelp API")]
    RateLimited,

    /// HTTP 400 from the directory, or a request rejected before sending.
    #[error("Yelp API rejected the request: {0}")]
    BadRequest(String),

    /// Any other non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Coarse classification callers map to their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    BadRequest,
    Upstream,
}

impl YelpError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            YelpError::RateLimited => ErrorKind::RateLimited,
            YelpError::BadRequest(_) => ErrorKind::BadRequest,
            YelpError::UnexpectedStatus { .. }
            | YelpError::Http(_)
            | YelpError::Deserialize { .. }
            | YelpError::InvalidBaseUrl { .. } => ErrorKind::Upstream,
        }
    }
}
