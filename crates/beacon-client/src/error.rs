//! Error types for the beacon client.

use thiserror::Error;

/// Errors that can occur while talking to a beacon node.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to load or parse configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The request never produced a response: connection refused, timeout, reset.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The beacon node answered with a non-2xx status.
    #[error(
        "upstream returned status {code}: {}",
        body.as_deref().unwrap_or("<empty body>")
    )]
    UpstreamStatus {
        /// HTTP status code.
        code: u16,
        /// Response body, if any, kept for diagnostics.
        body: Option<String>,
    },

    /// Response or event body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The event stream connection failed or was closed.
    #[error("SSE error: {0}")]
    Sse(String),

    /// A single event on the stream could not be parsed. The connection is still usable.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// URL parsing failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml_edit::de::Error),
}

impl Error {
    /// Upstream status code, if this is an [`Error::UpstreamStatus`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
