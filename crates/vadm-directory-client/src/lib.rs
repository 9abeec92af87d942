//! # vadm-directory-client — Typed Rust client for the cloud-directory IdP
//!
//! Provides ergonomic, typed access to the identity provider backing the
//! verifier administration service:
//!
//! - **Token grants** — password grant for user login, client-credentials
//!   grant for management-API access.
//! - **Cloud directory** — user sign-up, lookup, removal, reset-password
//!   email, per-user custom attributes.
//! - **Roles & scopes** — application scope registration and role
//!   creation/assignment for the onboarding flow.
//!
//! ## Architecture
//!
//! This crate is the only path the service uses to talk to the identity
//! provider. All management endpoints live under
//! `{auth_server}/management/v4/{tenant}`; token grants go to
//! `{auth_server}/oauth/v4/{tenant}/token`.
//!
//! Transient transport failures are retried with exponential backoff
//! (see [`retry`]); non-2xx responses are surfaced as
//! [`DirectoryApiError::Api`] with the endpoint label and response body.

pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod roles;
pub mod token;
pub mod users;

pub use config::DirectoryConfig;
pub use error::DirectoryApiError;
pub use token::TokenResponse;
pub use users::{DirectoryUser, NewDirectoryUser};

use std::time::Duration;

/// Client for the cloud-directory identity provider.
///
/// Cheap to clone — the inner `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    /// Create a new directory client from configuration.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DirectoryApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    /// The OAuth token endpoint for this tenant.
    pub(crate) fn token_url(&self) -> String {
        format!(
            "{}oauth/v4/{}/token",
            self.config.auth_server_host, self.config.tenant_id
        )
    }

    /// A management-API URL for this tenant. `path` must start with `/`.
    pub(crate) fn management_url(&self, path: &str) -> String {
        format!(
            "{}management/v4/{}{path}",
            self.config.auth_server_host, self.config.tenant_id
        )
    }

    /// The per-user custom attribute endpoint (authorized by the user's
    /// own access token, not a management token).
    pub(crate) fn attribute_url(&self, name: &str) -> String {
        format!("{}api/v1/attributes/{name}", self.config.auth_server_host)
    }

    /// The OAuth client id this application registered with the directory.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &DirectoryConfig {
        &self.config
    }
}
