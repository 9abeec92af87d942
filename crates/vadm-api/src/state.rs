//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor, plus the API-layer record types.
//!
//! ## Architecture
//!
//! AppState holds:
//! - **Postgres pool** — durable storage for customers, organizations,
//!   verifiers, users, and profiles (see [`crate::db`]).
//! - **Directory client** — typed client for the cloud-directory identity
//!   provider (user onboarding, login, roles). Optional: when absent, the
//!   user endpoints return 503.
//! - **Credential client** — typed client for the credential issuance
//!   service. Optional: when absent, verifier issuance/revocation return 503.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;
use vadm_core::{EntityStatus, UserRole, VerifierStatus};

use crate::error::AppError;

// -- Record Types -------------------------------------------------------------

/// A customer — the top of the tenant hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub customer_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    /// `active` or `inactive` (soft delete).
    #[schema(value_type = String)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Postal address bound 1:1 to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub address_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// An organization within a customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRecord {
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_employees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_employees: Option<String>,
    /// `active` or `inactive` (soft delete).
    #[schema(value_type = String)]
    pub status: EntityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A verifier — the credential-holding endpoint of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifierRecord {
    pub verifier_id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub verifier_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
    /// DID of the issued credential, used for revocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    /// Serialized credential document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// `active`, `revoked`, or `pending` (revocation unconfirmed).
    #[schema(value_type = String)]
    pub status: VerifierStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An administrative user. The primary key is the identity provider's
/// subject id. Wildcard (`*`) scopes are stored in the database but hidden
/// from API output.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    #[schema(value_type = String)]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One profile row: a `(config_id, version)` binding under a profile id.
/// The base row created with `POST /profiles/{id}` has a null config.
#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub id: i64,
    pub profile_id: String,
    pub config_id: Option<String>,
    pub version: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single bound verifier configuration in the grouped profile view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfiguration {
    pub config_id: String,
    pub version: String,
}

/// Grouped profile view returned by the profile endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile_id: String,
    pub verifier_configurations: Vec<ProfileConfiguration>,
}

impl ProfileView {
    /// Group profile rows into the API view, dropping unbound base rows.
    pub fn from_rows(profile_id: &str, rows: &[ProfileRow]) -> Self {
        let verifier_configurations = rows
            .iter()
            .filter_map(|row| match (&row.config_id, &row.version) {
                (Some(config_id), Some(version)) => Some(ProfileConfiguration {
                    config_id: config_id.clone(),
                    version: version.clone(),
                }),
                _ => None,
            })
            .collect();
        Self {
            profile_id: profile_id.to_string(),
            verifier_configurations,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Default validity of issued verifier credentials, in days.
    pub verifier_expiry_days: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("verifier_expiry_days", &self.verifier_expiry_days)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            verifier_expiry_days: 30,
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables:
    /// `PORT`, `AUTH_TOKEN`, `VERIFIER_EXPIRY_DAYS`.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            auth_token: std::env::var("AUTH_TOKEN").ok(),
            verifier_expiry_days: std::env::var("VERIFIER_EXPIRY_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly: the pool and both clients are reference-counted
/// internally.
#[derive(Debug, Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub db: PgPool,
    /// Identity provider client. `None` when not configured — user
    /// endpoints then return 503.
    pub directory: Option<vadm_directory_client::DirectoryClient>,
    /// Credential service client. `None` when not configured — verifier
    /// issuance and revocation then return 503.
    pub credentials: Option<vadm_credential_client::CredentialClient>,
    /// Configuration.
    pub config: AppConfig,
}

impl AppState {
    /// The directory client, or 503 when the identity provider is not
    /// configured.
    pub fn directory(&self) -> Result<&vadm_directory_client::DirectoryClient, AppError> {
        self.directory
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("directory service not configured".into()))
    }

    /// The credential client, or 503 when the credential service is not
    /// configured.
    pub fn credentials(&self) -> Result<&vadm_credential_client::CredentialClient, AppError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("credential service not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_debug_redacts_token() {
        let config = AppConfig {
            port: 8080,
            auth_token: Some("super-secret".to_string()),
            verifier_expiry_days: 30,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert_eq!(config.verifier_expiry_days, 30);
    }

    #[test]
    fn profile_view_groups_bound_configs() {
        let now = Utc::now();
        let rows = vec![
            ProfileRow {
                id: 1,
                profile_id: "p1".into(),
                config_id: None,
                version: None,
                updated_by: Some("admin".into()),
                created_at: now,
                updated_at: now,
            },
            ProfileRow {
                id: 2,
                profile_id: "p1".into(),
                config_id: Some("cfg-1".into()),
                version: Some("1.0.0".into()),
                updated_by: Some("admin".into()),
                created_at: now,
                updated_at: now,
            },
            ProfileRow {
                id: 3,
                profile_id: "p1".into(),
                config_id: Some("cfg-1".into()),
                version: Some("1.1.0".into()),
                updated_by: Some("admin".into()),
                created_at: now,
                updated_at: now,
            },
        ];

        let view = ProfileView::from_rows("p1", &rows);
        assert_eq!(view.profile_id, "p1");
        assert_eq!(view.verifier_configurations.len(), 2);
        assert_eq!(view.verifier_configurations[0].config_id, "cfg-1");
        assert_eq!(view.verifier_configurations[1].version, "1.1.0");
    }

    #[test]
    fn user_record_hides_wildcard_scopes_when_none() {
        let now = Utc::now();
        let user = UserRecord {
            user_id: "u1".into(),
            role: UserRole::Sysadmin,
            customer_id: None,
            org_id: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("customerId"));
        assert!(!json.contains("orgId"));
    }
}
