use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the mentoring API.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// The API answered with a 4xx or 5xx status.
    ///
    /// A 429 only surfaces here when the single inline reissue after a
    /// `retry-after` wait failed as well.
    #[error("HTTP {status} from {url}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The body could not be decoded into the expected shape.
    #[error("Malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create an HTTP status error.
    #[inline]
    pub fn http(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The HTTP status carried by this error, if any.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is worth retrying with backoff.
    ///
    /// Connection failures, server errors and a rate limit that outlived its
    /// inline reissue are transient. Other client errors and undecodable
    /// bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse { .. } | Self::Config(_) => false,
        }
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps log lines compact
/// when the server returns a multi-line body.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, Error>;
