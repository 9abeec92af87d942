//! Role and scope management on the directory's management API.
//!
//! ## Endpoints (management API)
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/roles` | List roles |
//! | POST   | `/roles` | Create role |
//! | DELETE | `/roles/{id}` | Delete role |
//! | GET    | `/users/{profileId}/roles` | Roles assigned to a profile |
//! | PUT    | `/users/{profileId}/roles` | Replace assigned role ids |
//! | GET    | `/applications/{clientId}/scopes` | List application scopes |
//! | PUT    | `/applications/{clientId}/scopes` | Replace application scopes |
//!
//! Scope updates are read-modify-write: the directory stores the full scope
//! list per application, so concurrent setup runs should be avoided.

use serde::{Deserialize, Serialize};

use crate::error::DirectoryApiError;
use crate::users::{expect_json, expect_success};
use crate::DirectoryClient;

/// A role object in the directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RolesResponse {
    #[serde(default)]
    roles: Vec<DirectoryRole>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScopesBody {
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Serialize)]
struct CreateRoleRequest<'a> {
    name: &'a str,
    description: &'a str,
    access: Vec<RoleAccess<'a>>,
}

#[derive(Serialize)]
struct RoleAccess<'a> {
    application_id: &'a str,
    scopes: Vec<&'a str>,
}

#[derive(Serialize)]
struct AssignRolesRequest {
    roles: AssignRoleIds,
}

#[derive(Serialize)]
struct AssignRoleIds {
    ids: Vec<String>,
}

impl DirectoryClient {
    /// List all roles defined in the directory.
    pub async fn list_roles(
        &self,
        mgmt_token: &str,
    ) -> Result<Vec<DirectoryRole>, DirectoryApiError> {
        let endpoint = "GET /roles";
        let url = self.management_url("/roles");

        let resp =
            crate::retry::retry_send(|| self.http().get(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                })?;

        let body: RolesResponse = expect_json(resp, endpoint).await?;
        Ok(body.roles)
    }

    /// Resolve directory role names to ids, skipping names with no match.
    pub async fn role_ids_for_names(
        &self,
        mgmt_token: &str,
        names: &[&str],
    ) -> Result<Vec<String>, DirectoryApiError> {
        let all = self.list_roles(mgmt_token).await?;
        Ok(names
            .iter()
            .filter_map(|name| all.iter().find(|r| r.name == *name))
            .map(|r| r.id.clone())
            .collect())
    }

    /// Create a role bound to one scope of this application. Idempotent:
    /// if a role with the name already exists its id is returned unchanged.
    pub async fn create_role(
        &self,
        mgmt_token: &str,
        name: &str,
        scope: &str,
    ) -> Result<String, DirectoryApiError> {
        if let Some(existing) = self
            .list_roles(mgmt_token)
            .await?
            .into_iter()
            .find(|r| r.name == name)
        {
            tracing::debug!(role = name, "directory role already exists");
            return Ok(existing.id);
        }

        let endpoint = "POST /roles";
        let url = self.management_url("/roles");
        let body = CreateRoleRequest {
            name,
            description: "Managed by verifier administration",
            access: vec![RoleAccess {
                application_id: &self.config().client_id,
                scopes: vec![scope],
            }],
        };

        let resp = crate::retry::retry_send(|| {
            self.http()
                .post(&url)
                .bearer_auth(mgmt_token)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let created: DirectoryRole = expect_json(resp, endpoint).await?;
        Ok(created.id)
    }

    /// Delete a role by name. No-op when the role does not exist.
    pub async fn delete_role(
        &self,
        mgmt_token: &str,
        name: &str,
    ) -> Result<(), DirectoryApiError> {
        let role = match self
            .list_roles(mgmt_token)
            .await?
            .into_iter()
            .find(|r| r.name == name)
        {
            Some(role) => role,
            None => return Ok(()),
        };

        let endpoint = format!("DELETE /roles/{}", role.id);
        let url = self.management_url(&format!("/roles/{}", role.id));

        let resp =
            crate::retry::retry_send(|| self.http().delete(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;

        expect_success(resp, &endpoint).await
    }

    /// Assign roles to a user profile, merging with any existing assignments.
    pub async fn assign_roles_to_profile(
        &self,
        mgmt_token: &str,
        profile_id: &str,
        role_ids: &[String],
    ) -> Result<(), DirectoryApiError> {
        let get_endpoint = format!("GET /users/{profile_id}/roles");
        let url = self.management_url(&format!("/users/{profile_id}/roles"));

        let resp =
            crate::retry::retry_send(|| self.http().get(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: get_endpoint.clone(),
                    source: e,
                })?;
        let current: RolesResponse = expect_json(resp, &get_endpoint).await?;

        let mut merged: Vec<String> = current.roles.into_iter().map(|r| r.id).collect();
        for id in role_ids {
            if !merged.contains(id) {
                merged.push(id.clone());
            }
        }

        let put_endpoint = format!("PUT /users/{profile_id}/roles");
        let body = AssignRolesRequest {
            roles: AssignRoleIds { ids: merged },
        };

        let resp = crate::retry::retry_send(|| {
            self.http()
                .put(&url)
                .bearer_auth(mgmt_token)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: put_endpoint.clone(),
            source: e,
        })?;

        expect_success(resp, &put_endpoint).await
    }

    /// Current scopes registered on this application.
    pub async fn application_scopes(
        &self,
        mgmt_token: &str,
    ) -> Result<Vec<String>, DirectoryApiError> {
        let endpoint = "GET /applications/{clientId}/scopes";
        let url = self.management_url(&format!(
            "/applications/{}/scopes",
            self.config().client_id
        ));

        let resp =
            crate::retry::retry_send(|| self.http().get(&url).bearer_auth(mgmt_token).send())
                .await
                .map_err(|e| DirectoryApiError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                })?;

        let body: ScopesBody = expect_json(resp, endpoint).await?;
        Ok(body.scopes)
    }

    /// Register a scope on this application. No-op when already present.
    pub async fn create_scope(
        &self,
        mgmt_token: &str,
        scope: &str,
    ) -> Result<(), DirectoryApiError> {
        let mut scopes = self.application_scopes(mgmt_token).await?;
        if scopes.iter().any(|s| s == scope) {
            tracing::debug!(scope, "application scope already registered");
            return Ok(());
        }
        scopes.push(scope.to_string());
        self.put_application_scopes(mgmt_token, scopes).await
    }

    /// Remove a scope from this application. No-op when absent.
    pub async fn remove_scope(
        &self,
        mgmt_token: &str,
        scope: &str,
    ) -> Result<(), DirectoryApiError> {
        let mut scopes = self.application_scopes(mgmt_token).await?;
        let before = scopes.len();
        scopes.retain(|s| s != scope);
        if scopes.len() == before {
            return Ok(());
        }
        self.put_application_scopes(mgmt_token, scopes).await
    }

    async fn put_application_scopes(
        &self,
        mgmt_token: &str,
        scopes: Vec<String>,
    ) -> Result<(), DirectoryApiError> {
        let endpoint = "PUT /applications/{clientId}/scopes";
        let url = self.management_url(&format!(
            "/applications/{}/scopes",
            self.config().client_id
        ));
        let body = ScopesBody { scopes };

        let resp = crate::retry::retry_send(|| {
            self.http()
                .put(&url)
                .bearer_auth(mgmt_token)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| DirectoryApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        expect_success(resp, endpoint).await
    }
}
