//! Directory client error types.

/// Errors from directory API calls.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Directory API returned a non-2xx status.
    #[error("directory API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl DirectoryApiError {
    /// The HTTP status carried by an [`DirectoryApiError::Api`] error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure was a transport-level timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
