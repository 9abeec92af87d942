//! Directory client configuration.
//!
//! All values come from the `APP_ID_*` environment variables. The client
//! secret is held in a [`zeroize::Zeroizing`] wrapper and redacted from
//! `Debug` output.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to the cloud-directory identity provider.
///
/// Custom `Debug` implementation redacts the `client_secret` field to
/// prevent credential leakage in log output.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Base URL of the auth server, e.g. `https://eu-gb.appid.cloud.ibm.com`.
    pub auth_server_host: Url,
    /// Tenant identifier.
    pub tenant_id: String,
    /// OAuth client id of this application.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("auth_server_host", &self.auth_server_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `APP_ID_AUTH_SERVER_HOST` (required)
    /// - `APP_ID_TENANT_ID` (required)
    /// - `APP_ID_CLIENT_ID` (required)
    /// - `APP_ID_SECRET` (required)
    /// - `APP_ID_TIMEOUT_SECS` (default: 30)
    ///
    /// The error names the first missing variable so misconfigured
    /// deployments fail with an actionable message.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = require_var("APP_ID_AUTH_SERVER_HOST")?;
        let auth_server_host = Url::parse(&host)
            .map_err(|e| ConfigError::InvalidUrl("APP_ID_AUTH_SERVER_HOST".into(), e.to_string()))?;

        Ok(Self {
            auth_server_host,
            tenant_id: require_var("APP_ID_TENANT_ID")?,
            client_id: require_var("APP_ID_CLIENT_ID")?,
            client_secret: Zeroizing::new(require_var("APP_ID_SECRET")?),
            timeout_secs: std::env::var("APP_ID_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    pub fn local_mock(base_url: &str, tenant_id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            auth_server_host: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl("base_url".into(), e.to_string()))?,
            tenant_id: tenant_id.to_string(),
            client_id: "test-client".to_string(),
            client_secret: Zeroizing::new("test-secret".to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = DirectoryConfig::local_mock("http://127.0.0.1:9100", "tenant-1").unwrap();
        assert_eq!(cfg.tenant_id, "tenant-1");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.auth_server_host.as_str(), "http://127.0.0.1:9100/");
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = DirectoryConfig::local_mock("http://127.0.0.1:9100", "tenant-1").unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-secret"));
    }
}
