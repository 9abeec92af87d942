//! # vadm-credential-client — Typed Rust client for the credential service
//!
//! Provides ergonomic, typed access to the credential issuance service
//! backing verifier administration:
//!
//! - **Issuance** — sign a verifier credential against a schema, returning
//!   the credential document and its DID.
//! - **Revocation** — revoke a credential by id with a reason.
//! - **Revoke status** — query whether a revocation has been recorded,
//!   used to reconcile verifiers stuck in the pending state.
//! - **Schema resolution** — derive the schema id from the service's own
//!   health-authority record when none is configured.
//! - **QR rendering** — encode a credential document as a PNG QR image
//!   (see [`qr`]).
//!
//! ## Architecture
//!
//! All endpoints live under `{base}/api/v1`. Every call carries the
//! caller's bearer token plus the configured issuer id in the
//! `x-hpass-issuer-id` header; issuance additionally carries a
//! transaction id in `x-hpass-txn-id` for cross-service tracing.
//!
//! Responses wrap their content in a `payload` envelope. Transient
//! transport failures are retried with exponential backoff (see [`retry`]);
//! non-2xx responses are surfaced as [`CredentialApiError::Api`] with the
//! endpoint label and response body.

pub mod config;
pub mod error;
pub mod qr;
pub(crate) mod retry;

pub use config::CredentialConfig;
pub use error::CredentialApiError;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vadm_core::{ISSUER_ID_HEADER, TXN_ID_HEADER, VERIFIER_CREDENTIAL_TYPE};

/// Client for the credential issuance service.
///
/// Cheap to clone — the inner `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    http: reqwest::Client,
    config: CredentialConfig,
}

/// Response envelope used by every credential service endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    payload: Option<T>,
}

/// Credential subject for a verifier credential.
///
/// This is the `data` block signed into the credential; scanning apps use
/// it to identify which verifier configuration the holder may fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierCredentialData {
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Display name shown in the scanning app (label when set, else name).
    pub name: String,
    pub verifier_type: String,
    pub organization_id: String,
    pub customer_id: String,
    pub config_id: String,
    pub config_name: String,
    pub customer: String,
    pub organization: String,
}

impl VerifierCredentialData {
    /// The credential type string stamped into every verifier credential.
    pub fn credential_type() -> &'static str {
        VERIFIER_CREDENTIAL_TYPE
    }
}

#[derive(Serialize)]
struct IssueRequest<'a> {
    #[serde(rename = "schemaID")]
    schema_id: &'a str,
    data: &'a VerifierCredentialData,
    #[serde(rename = "type")]
    credential_types: Vec<&'static str>,
    #[serde(rename = "expirationDate")]
    expiration_date: DateTime<Utc>,
}

#[derive(Serialize)]
struct RevokeRequest<'a> {
    #[serde(rename = "credentialID")]
    credential_id: &'a str,
    reason: &'a str,
}

/// A credential returned by the issuance endpoint.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// The credential's DID, used later for revocation.
    pub did: String,
    /// Issuer DID recorded on the credential.
    pub issuer: Option<String>,
    /// The full signed credential document.
    pub document: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct HealthAuthority {
    id: String,
}

impl CredentialClient {
    /// Create a new credential client from configuration.
    pub fn new(config: CredentialConfig) -> Result<Self, CredentialApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CredentialApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    /// An API URL under the service's `/api/v1` prefix. `path` must start
    /// with `/`.
    fn api_url(&self, path: &str) -> String {
        format!("{}api/v1{path}", self.config.base_url)
    }

    /// The issuer id stamped into issuance and revocation headers.
    pub fn issuer_id(&self) -> &str {
        &self.config.issuer_id
    }

    /// The schema id for verifier credentials.
    ///
    /// Uses the configured id when present; otherwise resolves the service's
    /// own health-authority record and combines its DID with the configured
    /// schema name (`{did};{schema_name}`).
    pub async fn resolve_schema_id(&self, token: &str) -> Result<String, CredentialApiError> {
        if let Some(id) = &self.config.schema_id {
            return Ok(id.clone());
        }

        let endpoint = "GET /health-authorities";
        let url = self.api_url("/health-authorities");

        let resp = crate::retry::retry_send(|| {
            self.http
                .get(&url)
                .bearer_auth(token)
                .header(ISSUER_ID_HEADER, &self.config.issuer_id)
                .query(&[("own", "true")])
                .send()
        })
        .await
        .map_err(|e| CredentialApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let body: Envelope<Vec<HealthAuthority>> = expect_json(resp, endpoint).await?;
        let authorities = body.payload.unwrap_or_default();
        if authorities.len() != 1 {
            return Err(CredentialApiError::SchemaResolution(format!(
                "expected exactly one own health authority, got {}",
                authorities.len()
            )));
        }
        Ok(format!(
            "{};{}",
            authorities[0].id, self.config.schema_name
        ))
    }

    /// Issue a verifier credential.
    ///
    /// The schema id is resolved first when none is configured. A 2xx reply
    /// whose payload lacks an `id` is treated as an error: a credential
    /// without a DID can never be revoked.
    pub async fn issue_verifier_credential(
        &self,
        token: &str,
        txn_id: &str,
        data: &VerifierCredentialData,
        expiration_date: DateTime<Utc>,
    ) -> Result<IssuedCredential, CredentialApiError> {
        let schema_id = self.resolve_schema_id(token).await?;

        let endpoint = "POST /credentials";
        let url = self.api_url("/credentials");
        let body = IssueRequest {
            schema_id: &schema_id,
            data,
            credential_types: vec![VERIFIER_CREDENTIAL_TYPE],
            expiration_date,
        };

        let resp = crate::retry::retry_send(|| {
            self.http
                .post(&url)
                .bearer_auth(token)
                .header(ISSUER_ID_HEADER, &self.config.issuer_id)
                .header(TXN_ID_HEADER, txn_id)
                .query(&[("type", "string")])
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| CredentialApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let envelope: Envelope<serde_json::Value> = expect_json(resp, endpoint).await?;
        let document = envelope.payload.ok_or_else(|| CredentialApiError::Incomplete {
            endpoint: endpoint.into(),
            detail: "missing payload".into(),
        })?;

        let did = document
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CredentialApiError::Incomplete {
                endpoint: endpoint.into(),
                detail: "payload has no credential id".into(),
            })?
            .to_string();
        let issuer = document
            .get("issuer")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        tracing::info!(did = %did, "issued verifier credential");
        Ok(IssuedCredential {
            did,
            issuer,
            document,
        })
    }

    /// Revoke a credential by DID.
    ///
    /// The service rejects double revocations with a 4xx whose body notes
    /// the revocation already exists; callers classify that through
    /// [`CredentialApiError::body`].
    pub async fn revoke_credential(
        &self,
        token: &str,
        credential_id: &str,
        reason: &str,
    ) -> Result<(), CredentialApiError> {
        let endpoint = "POST /credentials/revoke";
        let url = self.api_url("/credentials/revoke");
        let body = RevokeRequest {
            credential_id,
            reason,
        };

        let resp = crate::retry::retry_send(|| {
            self.http
                .post(&url)
                .bearer_auth(token)
                .header(ISSUER_ID_HEADER, &self.config.issuer_id)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| CredentialApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        expect_success(resp, endpoint).await?;
        tracing::info!(credential_id = %credential_id, "revoked verifier credential");
        Ok(())
    }

    /// Whether a revocation record exists for a credential.
    ///
    /// Uses the optional revoke-status endpoint: a payload carrying the
    /// credential id means the revocation went through; an empty payload
    /// means it has not been recorded.
    pub async fn is_revoked(
        &self,
        token: &str,
        credential_id: &str,
    ) -> Result<bool, CredentialApiError> {
        // DIDs embed '#' fragment separators, which must survive the path.
        let encoded = credential_id.replace('#', "%23");
        let endpoint = "GET /credentials/{id}/revoke_status/optional";
        let url = self.api_url(&format!("/credentials/{encoded}/revoke_status/optional"));

        let resp = crate::retry::retry_send(|| {
            self.http
                .get(&url)
                .bearer_auth(token)
                .header(ISSUER_ID_HEADER, &self.config.issuer_id)
                .send()
        })
        .await
        .map_err(|e| CredentialApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let envelope: Envelope<serde_json::Value> = expect_json(resp, endpoint).await?;
        Ok(envelope
            .payload
            .as_ref()
            .and_then(|p| p.get("id"))
            .and_then(|v| v.as_str())
            .is_some())
    }
}

async fn expect_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    endpoint: &str,
) -> Result<T, CredentialApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(CredentialApiError::Api {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }
    resp.json()
        .await
        .map_err(|e| CredentialApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
}

async fn expect_success(
    resp: reqwest::Response,
    endpoint: &str,
) -> Result<(), CredentialApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(CredentialApiError::Api {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }
    Ok(())
}
