//! Error taxonomy for the cost query pipeline
//!
//! Every variant is terminal for the current call. Nothing here is retried
//! internally; callers decide whether to try again.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, CostError>;

/// Errors raised while translating, sending or decoding a cost query
#[derive(Debug, Error)]
pub enum CostError {
    /// The window token is neither `<N>d` nor a valid duration
    #[error("invalid window format: {0}")]
    InvalidWindowFormat(String),

    /// The configured backend URL could not be parsed
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The backend answered with a non-success HTTP status
    #[error("kubecost API error: status={status}, body={body}")]
    BackendHttp { status: u16, body: String },

    /// The backend answered 2xx but reported an application-level failure
    #[error("kubecost API returned error code {code}: {message}")]
    BackendApplication { code: i64, message: String },

    /// The response body was not the JSON shape we expect
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Network-level failure, including timeouts
    #[error("executing request: {0}")]
    Transport(#[from] reqwest::Error),
}

impl CostError {
    /// Stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            CostError::InvalidWindowFormat(_) => "invalid_window",
            CostError::InvalidBaseUrl { .. } => "invalid_base_url",
            CostError::BackendHttp { .. } => "backend_http",
            CostError::BackendApplication { .. } => "backend_application",
            CostError::Decode(_) => "decode",
            CostError::Transport(_) => "transport",
        }
    }

    /// True when the failure came from a request deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, CostError::Transport(e) if e.is_timeout())
    }
}
