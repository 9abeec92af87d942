//! Credential service configuration.
//!
//! All values come from the `CREDENTIALS_*` / `VC_*` environment variables.
//! The caller's bearer token is passed per request, so no secret is stored
//! here.

use url::Url;

/// Configuration for connecting to the credential issuance service.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Base URL of the credential service, e.g.
    /// `https://credentials.example.com`. The API prefix `/api/v1` is
    /// appended by the client.
    pub base_url: Url,
    /// Issuer id sent in the `x-hpass-issuer-id` header on every call.
    pub issuer_id: String,
    /// Fully-qualified schema id for verifier credentials. When unset, the
    /// schema id is resolved at issuance time from the service's own
    /// health-authority record.
    pub schema_id: Option<String>,
    /// Schema name used when resolving the schema id dynamically.
    pub schema_name: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl CredentialConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CREDENTIALS_API_URL` (required)
    /// - `VC_ISSUER_ID` (required)
    /// - `VC_SCHEMA_ID` (optional; resolved dynamically when unset)
    /// - `VC_SCHEMA_NAME` (default: `verifier-credential`)
    /// - `CREDENTIALS_TIMEOUT_SECS` (default: 60)
    ///
    /// The error names the first missing variable so misconfigured
    /// deployments fail with an actionable message.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = require_var("CREDENTIALS_API_URL")?;
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("CREDENTIALS_API_URL".into(), e.to_string()))?;

        Ok(Self {
            base_url,
            issuer_id: require_var("VC_ISSUER_ID")?,
            schema_id: std::env::var("VC_SCHEMA_ID").ok().filter(|s| !s.is_empty()),
            schema_name: std::env::var("VC_SCHEMA_NAME")
                .unwrap_or_else(|_| "verifier-credential".to_string()),
            timeout_secs: std::env::var("CREDENTIALS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl("base_url".into(), e.to_string()))?,
            issuer_id: "test-issuer".to_string(),
            schema_id: None,
            schema_name: "verifier-credential".to_string(),
            timeout_secs: 5,
        })
    }
}

fn require_var(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: missing variable '{0}'")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
