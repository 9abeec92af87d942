//! # User API
//!
//! Administrative users live in the external directory service; the local
//! `users` table only binds the directory subject id to a role and tenant
//! scope. Onboarding therefore fans out: directory sign-up, role
//! assignment, custom attributes, then the local row.
//!
//! ## Endpoints
//!
//! - `POST /users/login` — password grant against the directory
//! - `POST /users` — onboard user (custadmin)
//! - `DELETE /users` — offboard user by id or email (custadmin)
//! - `GET /users?customerId=&orgId=` — list users (custadmin)
//! - `POST /users/reset-password` — trigger reset-password email
//! - `POST /users/app-setup` — register directory scopes and roles (sysadmin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use vadm_core::{
    validate_email, EntityStatus, UserRole, DIRECTORY_ROLES, DIRECTORY_SCOPES, WILDCARD_SCOPE,
};
use vadm_directory_client::users::generate_password;
use vadm_directory_client::NewDirectoryUser;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::state::{AppState, UserRecord};
use crate::{db, AppResult};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Login request for the directory password grant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        validate_email(&self.email).map_err(|e| e.to_string())?;
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

/// Tokens returned on successful login (OAuth shape).
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Request to onboard a new administrative user.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// One of `sysadmin`, `custadmin`, `orgadmin`.
    pub role: String,
    pub customer_id: Option<String>,
    pub org_id: Option<String>,
}

impl Validate for OnboardUserRequest {
    fn validate(&self) -> Result<(), String> {
        validate_email(&self.email).map_err(|e| e.to_string())?;
        require_non_blank("firstName", &self.first_name)?;
        require_non_blank("lastName", &self.last_name)?;
        self.role
            .parse::<UserRole>()
            .map_err(|e| e.to_string())
            .map(|_| ())
    }
}

/// Request identifying a user by id or email.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSelector {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Validate for UserSelector {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_none() && self.email.is_none() {
            return Err("either userId or email is required".to_string());
        }
        if let Some(ref email) = self.email {
            validate_email(email).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Query filters for the user list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    pub customer_id: Option<String>,
    pub org_id: Option<String>,
}

/// A user in list output: the local scope binding joined with the
/// directory profile.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[schema(value_type = String)]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

/// Response after an offboard.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OffboardResponse {
    pub user_id: String,
}

/// Summary of an app-setup run.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSetupResponse {
    pub scopes: Vec<String>,
    pub roles: Vec<String>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).post(onboard_user).delete(offboard_user),
        )
        .route("/users/login", post(login))
        .route("/users/reset-password", post(reset_password))
        .route("/users/app-setup", post(app_setup))
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Resolve the tenant scope for a role from the request, enforcing the
/// role-conditional requirements.
fn resolve_scope(
    role: UserRole,
    customer_id: Option<String>,
    org_id: Option<String>,
) -> AppResult<(Option<String>, Option<String>)> {
    let customer_id = match role.requires_customer() {
        true => Some(customer_id.ok_or_else(|| {
            AppError::Validation(format!("customerId is required for role '{}'", role.as_str()))
        })?),
        false => None,
    };
    let org_id = match role.requires_org() {
        true => Some(org_id.ok_or_else(|| {
            AppError::Validation(format!("orgId is required for role '{}'", role.as_str()))
        })?),
        false => None,
    };
    Ok((customer_id, org_id))
}

/// Validate that a referenced customer (and optionally org under it)
/// exists and is active.
async fn check_scope_targets(
    state: &AppState,
    customer_id: &Option<String>,
    org_id: &Option<String>,
) -> AppResult<()> {
    let customer_uuid = match customer_id {
        Some(id) => {
            let uuid: Uuid = id
                .parse()
                .map_err(|_| AppError::Validation(format!("invalid customerId: {id}")))?;
            let customer = db::customers::find_by_id(&state.db, uuid)
                .await?
                .filter(|c| c.status == EntityStatus::Active)
                .ok_or_else(|| AppError::NotFound("invalid customer".into()))?;
            Some(customer.customer_id)
        }
        None => None,
    };

    if let Some(id) = org_id {
        let uuid: Uuid = id
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid orgId: {id}")))?;
        let org = db::organizations::find_by_id(&state.db, uuid)
            .await?
            .filter(|o| o.status == EntityStatus::Active)
            .ok_or_else(|| AppError::NotFound("invalid organization".into()))?;
        if let Some(customer_uuid) = customer_uuid {
            if org.customer_id != customer_uuid {
                return Err(AppError::NotFound("invalid organization".into()));
            }
        }
    }
    Ok(())
}

/// Remove a user from the directory and the local table. Used by the
/// customer and organization delete cascades.
pub(crate) async fn offboard_cascade(state: &AppState, user: &UserRecord) -> AppResult<()> {
    let directory = state.directory()?;
    let tokens = directory.management_token().await?;
    directory
        .delete_user(&tokens.access_token, &user.user_id)
        .await?;
    db::users::delete(&state.db, &user.user_id).await?;
    tracing::info!(user_id = %user.user_id, "user offboarded");
    Ok(())
}

/// Post-sign-up onboarding: role assignment, scope attributes, the local
/// scope binding, and the reset-password email. Split out so a failure in
/// any step can roll back the directory account.
async fn bind_directory_user(
    state: &AppState,
    mgmt_token: &str,
    created: &vadm_directory_client::DirectoryUser,
    role: UserRole,
    customer_id: Option<String>,
    org_id: Option<String>,
    email: &str,
    password: &str,
) -> AppResult<UserRecord> {
    let directory = state.directory()?;

    let profile_id = created.profile_id.as_deref().unwrap_or(&created.id);
    let role_ids = directory
        .role_ids_for_names(mgmt_token, role.directory_role_names())
        .await?;
    directory
        .assign_roles_to_profile(mgmt_token, profile_id, &role_ids)
        .await?;

    // Custom attributes are writable only with the user's own token.
    let user_tokens = directory.login(email, password).await?;
    directory
        .set_user_attribute(
            &user_tokens.access_token,
            "customer_id",
            customer_id.as_deref().unwrap_or(WILDCARD_SCOPE),
        )
        .await?;
    directory
        .set_user_attribute(
            &user_tokens.access_token,
            "org_id",
            org_id.as_deref().unwrap_or(WILDCARD_SCOPE),
        )
        .await?;

    if db::users::find_by_id(&state.db, &created.id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "user {} is already onboarded",
            created.id
        )));
    }

    let now = Utc::now();
    let record = UserRecord {
        user_id: created.id.clone(),
        role,
        customer_id,
        org_id,
        created_at: now,
        updated_at: now,
    };
    db::users::insert(&state.db, &record).await?;

    directory
        .send_reset_password_email(mgmt_token, &record.user_id)
        .await?;

    Ok(record)
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /users/login — Exchange email and password for tokens.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let req = extract_validated_json(body)?;
    let directory = state.directory()?;

    let tokens = directory
        .login(&req.email, &req.password)
        .await
        .map_err(|err| match err.status() {
            // The directory reports bad credentials as 400 or 401; both
            // collapse to a generic message so callers learn nothing more.
            Some(400) | Some(401) => AppError::Unauthorized("invalid credentials".into()),
            _ => err.into(),
        })?;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        id_token: tokens.id_token,
        token_type: tokens.token_type,
        expires_in: tokens.expires_in,
    }))
}

/// POST /users — Onboard an administrative user.
///
/// Creates the directory account with a generated password, assigns the
/// role's directory roles, stamps the tenant scope as custom attributes
/// (authorized by the new user's own token), and records the local scope
/// binding. A reset-password email gives the user their real password.
/// If any step after sign-up fails, the directory account is removed so
/// the email can be onboarded again.
#[utoipa::path(
    post,
    path = "/users",
    request_body = OnboardUserRequest,
    responses(
        (status = 201, description = "User onboarded", body = UserRecord),
        (status = 404, description = "Invalid customer or organization", body = crate::error::ErrorBody),
        (status = 409, description = "User already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn onboard_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<OnboardUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserRecord>)> {
    require_role(&caller, UserRole::Custadmin)?;
    let req = extract_validated_json(body)?;

    let role: UserRole = req.role.parse()?;
    let (customer_id, org_id) = resolve_scope(role, req.customer_id, req.org_id)?;
    check_scope_targets(&state, &customer_id, &org_id).await?;

    let directory = state.directory()?;
    let mgmt = directory.management_token().await?;

    if directory
        .find_user_by_email(&mgmt.access_token, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "a user with email '{}' already exists",
            req.email
        )));
    }

    let password = generate_password();
    let new_user = NewDirectoryUser {
        email: req.email.clone(),
        given_name: req.first_name.trim().to_string(),
        family_name: req.last_name.trim().to_string(),
        password: None,
    };
    let created = directory
        .sign_up(&mgmt.access_token, &new_user, &password)
        .await?;

    let record = match bind_directory_user(
        &state,
        &mgmt.access_token,
        &created,
        role,
        customer_id,
        org_id,
        &req.email,
        &password,
    )
    .await
    {
        Ok(record) => record,
        Err(err) => {
            // Roll back the half-onboarded account so the email can be
            // retried; a leftover directory user would trip the duplicate
            // check on every subsequent attempt.
            if let Err(cleanup) = directory.delete_user(&mgmt.access_token, &created.id).await {
                tracing::error!(
                    user_id = %created.id,
                    error = %cleanup,
                    "failed to remove directory user after onboarding error"
                );
            }
            if let Err(cleanup) = db::users::delete(&state.db, &created.id).await {
                tracing::error!(
                    user_id = %created.id,
                    error = %cleanup,
                    "failed to remove user row after onboarding error"
                );
            }
            return Err(err);
        }
    };

    tracing::info!(user_id = %record.user_id, role = %record.role.as_str(), "user onboarded");
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /users — Offboard a user by id or email.
#[utoipa::path(
    delete,
    path = "/users",
    request_body = UserSelector,
    responses(
        (status = 200, description = "User offboarded", body = OffboardResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn offboard_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<UserSelector>, JsonRejection>,
) -> AppResult<Json<OffboardResponse>> {
    require_role(&caller, UserRole::Custadmin)?;
    let req = extract_validated_json(body)?;

    let directory = state.directory()?;
    let mgmt = directory.management_token().await?;

    let user_id = match (req.user_id, req.email) {
        (Some(id), _) => id,
        (None, Some(email)) => directory
            .find_user_by_email(&mgmt.access_token, &email)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| AppError::NotFound(format!("no user with email '{email}'")))?,
        (None, None) => {
            return Err(AppError::Validation(
                "either userId or email is required".into(),
            ))
        }
    };

    let in_directory = directory.delete_user(&mgmt.access_token, &user_id).await?;
    let in_db = db::users::delete(&state.db, &user_id).await?;
    if !in_directory && !in_db {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }

    tracing::info!(user_id = %user_id, "user offboarded");
    Ok(Json(OffboardResponse { user_id }))
}

/// GET /users — List users by tenant scope, joined with directory profiles.
#[utoipa::path(
    get,
    path = "/users",
    params(
        ("customerId" = Option<String>, Query, description = "Filter by customer id"),
        ("orgId" = Option<String>, Query, description = "Filter by organization id"),
    ),
    responses(
        (status = 200, description = "Users", body = [UserView]),
        (status = 400, description = "Missing filter", body = crate::error::ErrorBody),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<UsersQuery>,
) -> AppResult<Json<Vec<UserView>>> {
    require_role(&caller, UserRole::Custadmin)?;
    if query.customer_id.is_none() && query.org_id.is_none() {
        return Err(AppError::BadRequest(
            "at least one of customerId or orgId is required".into(),
        ));
    }

    let rows = db::users::list_by_scope(
        &state.db,
        query.customer_id.as_deref(),
        query.org_id.as_deref(),
    )
    .await?;

    let directory = state.directory()?;
    let mgmt = directory.management_token().await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let profile = directory.get_user(&mgmt.access_token, &row.user_id).await?;
        views.push(UserView {
            email: profile
                .as_ref()
                .and_then(|p| p.primary_email())
                .map(str::to_string),
            display_name: profile.and_then(|p| p.display_name),
            user_id: row.user_id,
            role: row.role,
            customer_id: row.customer_id,
            org_id: row.org_id,
        });
    }
    Ok(Json(views))
}

/// POST /users/reset-password — Trigger the directory reset-password email.
#[utoipa::path(
    post,
    path = "/users/reset-password",
    request_body = UserSelector,
    responses(
        (status = 200, description = "Email sent"),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<UserSelector>, JsonRejection>,
) -> AppResult<StatusCode> {
    require_role(&caller, UserRole::Custadmin)?;
    let req = extract_validated_json(body)?;

    let directory = state.directory()?;
    let mgmt = directory.management_token().await?;

    let user_id = match (req.user_id, req.email) {
        (Some(id), _) => id,
        (None, Some(email)) => directory
            .find_user_by_email(&mgmt.access_token, &email)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| AppError::NotFound(format!("no user with email '{email}'")))?,
        (None, None) => {
            return Err(AppError::Validation(
                "either userId or email is required".into(),
            ))
        }
    };

    directory
        .send_reset_password_email(&mgmt.access_token, &user_id)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /users/app-setup — Register the application's directory scopes and
/// roles. Idempotent: existing scopes and roles are left untouched.
#[utoipa::path(
    post,
    path = "/users/app-setup",
    responses(
        (status = 200, description = "Setup summary", body = AppSetupResponse),
        (status = 503, description = "Directory unavailable", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn app_setup(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> AppResult<Json<AppSetupResponse>> {
    require_role(&caller, UserRole::Sysadmin)?;

    let directory = state.directory()?;
    let mgmt = directory.management_token().await?;

    let mut scopes = Vec::with_capacity(DIRECTORY_SCOPES.len());
    let mut roles = Vec::with_capacity(DIRECTORY_ROLES.len());
    for (scope, role) in DIRECTORY_SCOPES.iter().zip(DIRECTORY_ROLES.iter()) {
        directory.create_scope(&mgmt.access_token, scope).await?;
        scopes.push(scope.to_string());
        directory
            .create_role(&mgmt.access_token, role, scope)
            .await?;
        roles.push(role.to_string());
    }

    tracing::info!("directory application setup complete");
    Ok(Json(AppSetupResponse { scopes, roles }))
}
