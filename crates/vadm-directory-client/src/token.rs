//! Token grants against the tenant OAuth endpoint.
//!
//! Two grants are used:
//! - **password** — end-user login from the API's `/users/login` route.
//! - **client_credentials** — management-API access for onboarding flows.

use serde::Deserialize;

use crate::error::DirectoryApiError;
use crate::DirectoryClient;

/// Token response from the OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl DirectoryClient {
    /// Exchange a username and password for tokens (password grant).
    ///
    /// The directory responds 400/401 for bad credentials; callers decide
    /// how much of that to expose to end users.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, DirectoryApiError> {
        let endpoint = "POST /token (password)";
        let url = self.token_url();
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];

        let resp = crate::retry::retry_send(|| {
            self.http()
                .post(&url)
                .basic_auth(
                    &self.config().client_id,
                    Some(self.config().client_secret.as_str()),
                )
                .form(&form)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        deserialize_token(resp, endpoint).await
    }

    /// Obtain a management-API token via the client-credentials grant.
    pub async fn management_token(&self) -> Result<TokenResponse, DirectoryApiError> {
        let endpoint = "POST /token (client_credentials)";
        let url = self.token_url();
        let form = [("grant_type", "client_credentials")];

        let resp = crate::retry::retry_send(|| {
            self.http()
                .post(&url)
                .basic_auth(
                    &self.config().client_id,
                    Some(self.config().client_secret.as_str()),
                )
                .form(&form)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        deserialize_token(resp, endpoint).await
    }
}

async fn deserialize_token(
    resp: reqwest::Response,
    endpoint: &str,
) -> Result<TokenResponse, DirectoryApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(DirectoryApiError::Api {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    resp.json()
        .await
        .map_err(|e| DirectoryApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
}
