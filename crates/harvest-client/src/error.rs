use thiserror::Error;

/// Explorer client errors.
///
/// Rate limiting (HTTP 429 or a throttling message inside a 200 response) is
/// absorbed by [`crate::QueryClient`] and never shows up here.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Semaphore closed
    #[error("Semaphore closed")]
    SemaphoreClosed,

    /// Non-2xx, non-429 HTTP status
    #[error("Explorer returned HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    /// Response body is not the envelope we expect, or the envelope reports an error
    #[error("Unexpected explorer response: {reason}")]
    Protocol { reason: String },

    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Http(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;
