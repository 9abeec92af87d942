//! Cloud-directory user operations.
//!
//! ## Endpoints (management API)
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/cloud_directory/Users?query={email}` | Find by email |
//! | GET    | `/cloud_directory/Users/{id}` | Get by id |
//! | POST   | `/cloud_directory/sign_up?shouldCreateProfile=true&language=en` | Sign up |
//! | DELETE | `/cloud_directory/remove/{id}` | Remove user |
//! | POST   | `/cloud_directory/resend/RESET_PASSWORD` | Reset-password email |
//!
//! Custom attributes are set with the **user's own** access token against
//! `PUT {host}/api/v1/attributes/{name}` — the management token has no
//! authority there.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::DirectoryApiError;
use crate::DirectoryClient;

/// An email entry on a directory user (SCIM shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailEntry {
    pub value: String,
    #[serde(default)]
    pub primary: Option<bool>,
}

/// Structured name on a directory user (SCIM shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub formatted: Option<String>,
}

/// A user record as returned by the cloud directory.
///
/// Fields use `#[serde(default)]` for resilience against schema evolution;
/// the live directory returns more fields than are modeled here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    /// Cloud-directory user id.
    pub id: String,
    /// Profile id used for role assignment (present on sign-up responses).
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailEntry>,
    #[serde(default)]
    pub name: Option<ScimName>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DirectoryUser {
    /// The user's primary email, if any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary.unwrap_or(false))
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
    }
}

/// Query response for `GET /cloud_directory/Users`.
#[derive(Debug, Deserialize)]
struct UserQueryResponse {
    #[serde(rename = "totalResults", default)]
    total_results: u64,
    #[serde(rename = "Resources", default)]
    resources: Vec<DirectoryUser>,
}

/// A new user to sign up in the cloud directory.
#[derive(Debug, Clone)]
pub struct NewDirectoryUser {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    /// Initial password. When `None`, a random one is generated and a
    /// reset-password email should follow.
    pub password: Option<String>,
}

/// Sign-up request body (SCIM shape). `status: CONFIRMED` suppresses the
/// directory's own welcome email.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    active: bool,
    emails: Vec<EmailEntry>,
    user_name: &'a str,
    password: &'a str,
    name: ScimName,
    status: &'static str,
}

impl DirectoryClient {
    /// Find a cloud-directory user by email. Returns `None` when no user
    /// matches.
    pub async fn find_user_by_email(
        &self,
        mgmt_token: &str,
        email: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryApiError> {
        let endpoint = "GET /cloud_directory/Users";
        let url = self.management_url("/cloud_directory/Users");

        let resp = crate::retry::retry_send(|| {
            self.http()
                .get(&url)
                .bearer_auth(mgmt_token)
                .query(&[("query", email)])
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let query: UserQueryResponse = expect_json(resp, endpoint).await?;
        if query.total_results == 0 {
            return Ok(None);
        }
        Ok(query.resources.into_iter().next())
    }

    /// Fetch a cloud-directory user by id. Returns `None` on 404.
    pub async fn get_user(
        &self,
        mgmt_token: &str,
        user_id: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryApiError> {
        let endpoint = format!("GET /cloud_directory/Users/{user_id}");
        let url = self.management_url(&format!("/cloud_directory/Users/{user_id}"));

        let resp =
            crate::retry::retry_send(|| self.http().get(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_json(resp, &endpoint).await.map(Some)
    }

    /// Sign up a new user, creating its profile in the same call.
    pub async fn sign_up(
        &self,
        mgmt_token: &str,
        user: &NewDirectoryUser,
        password: &str,
    ) -> Result<DirectoryUser, DirectoryApiError> {
        let endpoint = "POST /cloud_directory/sign_up";
        let url = self.management_url("/cloud_directory/sign_up");
        let body = SignUpRequest {
            active: true,
            emails: vec![EmailEntry {
                value: user.email.clone(),
                primary: Some(true),
            }],
            user_name: &user.email,
            password,
            name: ScimName {
                given_name: Some(user.given_name.clone()),
                family_name: Some(user.family_name.clone()),
                formatted: None,
            },
            status: "CONFIRMED",
        };

        let resp = crate::retry::retry_send(|| {
            self.http()
                .post(&url)
                .bearer_auth(mgmt_token)
                .query(&[("shouldCreateProfile", "true"), ("language", "en")])
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        expect_json(resp, endpoint).await
    }

    /// Remove a user from the cloud directory. Returns `false` when the
    /// user did not exist.
    pub async fn delete_user(
        &self,
        mgmt_token: &str,
        user_id: &str,
    ) -> Result<bool, DirectoryApiError> {
        let endpoint = format!("DELETE /cloud_directory/remove/{user_id}");
        let url = self.management_url(&format!("/cloud_directory/remove/{user_id}"));

        let resp =
            crate::retry::retry_send(|| self.http().delete(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        expect_success(resp, &endpoint).await?;
        Ok(true)
    }

    /// Trigger the directory's reset-password email for a user.
    pub async fn send_reset_password_email(
        &self,
        mgmt_token: &str,
        user_id: &str,
    ) -> Result<(), DirectoryApiError> {
        let endpoint = "POST /cloud_directory/resend/RESET_PASSWORD";
        let url = self.management_url("/cloud_directory/resend/RESET_PASSWORD");
        let form = [("uuid", user_id)];

        let resp = crate::retry::retry_send(|| {
            self.http()
                .post(&url)
                .bearer_auth(mgmt_token)
                .form(&form)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        expect_success(resp, endpoint).await
    }

    /// Set a custom attribute on the calling user's profile. Authorized by
    /// the user's own access token.
    pub async fn set_user_attribute(
        &self,
        user_token: &str,
        name: &str,
        value: &str,
    ) -> Result<(), DirectoryApiError> {
        let endpoint = format!("PUT /api/v1/attributes/{name}");
        let url = self.attribute_url(name);

        let resp = crate::retry::retry_send(|| {
            self.http()
                .put(&url)
                .bearer_auth(user_token)
                .body(value.to_string())
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        expect_success(resp, &endpoint).await
    }
}

/// Generate a random 15-character initial password meeting the directory's
/// complexity policy (upper, lower, digit guaranteed).
pub fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut bytes = [0u8; 15];
    OsRng.fill_bytes(&mut bytes);
    let mut password: String = bytes
        .iter()
        .map(|b| CHARSET[*b as usize % CHARSET.len()] as char)
        .collect();
    // Anchor one of each required class so a pathological draw still passes.
    password.replace_range(0..3, "Av7");
    password
}

pub(crate) async fn expect_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    endpoint: &str,
) -> Result<T, DirectoryApiError> {
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

pub(crate) async fn expect_success(
    resp: reqwest::Response,
    endpoint: &str,
) -> Result<(), DirectoryApiError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(DirectoryApiError::Api {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }
    Ok(())
}
