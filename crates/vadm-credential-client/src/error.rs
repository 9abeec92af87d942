//! Credential client error types.

/// Errors from credential service API calls.
#[derive(Debug, thiserror::Error)]
pub enum CredentialApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Credential service returned a non-2xx status.
    #[error("credential service {endpoint} returned {status}: {body}")]
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
    /// The service replied 2xx but the payload was missing required fields.
    #[error("incomplete response from {endpoint}: {detail}")]
    Incomplete { endpoint: String, detail: String },
    /// Schema id resolution against the health-authority registry failed.
    #[error("schema resolution failed: {0}")]
    SchemaResolution(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl CredentialApiError {
    /// The HTTP status carried by a [`CredentialApiError::Api`] error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body carried by a [`CredentialApiError::Api`] error.
    /// Revocation flows inspect this to classify duplicate-revoke replies.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
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
