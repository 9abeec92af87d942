//! # Profile API
//!
//! A profile groups verifier configuration bindings under a caller-chosen
//! profile id. Rows are hard-deleted, unlike the soft-deleted tenant
//! entities. The reserved master profile id `-1` is never readable or
//! deletable through the API.
//!
//! ## Endpoints
//!
//! - `POST /profiles/:profile_id` — create profile (base row)
//! - `GET /profiles/:profile_id` — grouped view
//! - `PATCH /profiles/:profile_id/configs` — add a config binding
//! - `PATCH /profiles/:profile_id/configs/delete` — remove a config binding
//! - `DELETE /profiles/:profile_id` — hard-delete all rows (sysadmin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vadm_core::UserRole;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, ProfileView};
use crate::{db, AppResult};

/// Reserved profile id holding the master configuration set.
const MASTER_PROFILE_ID: &str = "-1";

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to create a profile.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub updated_by: String,
}

impl Validate for CreateProfileRequest {
    fn validate(&self) -> Result<(), String> {
        if self.updated_by.trim().is_empty() {
            return Err("updatedBy must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to bind a verifier configuration to a profile.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddConfigRequest {
    pub config_id: String,
    pub version: String,
    pub updated_by: String,
}

impl Validate for AddConfigRequest {
    fn validate(&self) -> Result<(), String> {
        if self.config_id.trim().is_empty() {
            return Err("configId must not be empty".to_string());
        }
        if self.version.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }
        if self.updated_by.trim().is_empty() {
            return Err("updatedBy must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to remove a verifier configuration binding.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfigRequest {
    pub config_id: String,
    pub version: String,
}

impl Validate for DeleteConfigRequest {
    fn validate(&self) -> Result<(), String> {
        if self.config_id.trim().is_empty() {
            return Err("configId must not be empty".to_string());
        }
        if self.version.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }
        Ok(())
    }
}

/// Response after a profile hard delete.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDeletedResponse {
    pub profile_id: String,
    pub deleted: u64,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the profiles router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profiles/:profile_id",
            get(get_profile).post(create_profile).delete(delete_profile),
        )
        .route("/profiles/:profile_id/configs", patch(add_config))
        .route("/profiles/:profile_id/configs/delete", patch(delete_config))
}

fn reject_master(profile_id: &str) -> AppResult<()> {
    if profile_id == MASTER_PROFILE_ID {
        return Err(AppError::Forbidden(
            "the master profile is not accessible".into(),
        ));
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /profiles/:id — Create a profile with its base row.
#[utoipa::path(
    post,
    path = "/profiles/{profile_id}",
    params(("profile_id" = String, Path, description = "Profile id")),
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileView),
        (status = 409, description = "Profile already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(profile_id): Path<String>,
    body: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProfileView>)> {
    require_role(&caller, UserRole::Orgadmin)?;
    let req = extract_validated_json(body)?;

    let rows = db::profiles::rows_for_profile(&state.db, &profile_id).await?;
    if !rows.is_empty() {
        return Err(AppError::Conflict(format!(
            "profile '{profile_id}' already exists"
        )));
    }

    db::profiles::insert_row(
        &state.db,
        &profile_id,
        None,
        None,
        req.updated_by.trim(),
        Utc::now(),
    )
    .await?;

    tracing::info!(profile_id = %profile_id, "profile created");
    Ok((
        StatusCode::CREATED,
        Json(ProfileView::from_rows(&profile_id, &[])),
    ))
}

/// GET /profiles/:id — Grouped profile view.
#[utoipa::path(
    get,
    path = "/profiles/{profile_id}",
    params(("profile_id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile", body = ProfileView),
        (status = 403, description = "Master profile", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(profile_id): Path<String>,
) -> AppResult<Json<ProfileView>> {
    require_role(&caller, UserRole::Orgadmin)?;
    reject_master(&profile_id)?;

    let rows = db::profiles::rows_for_profile(&state.db, &profile_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(format!(
            "profile '{profile_id}' not found"
        )));
    }
    Ok(Json(ProfileView::from_rows(&profile_id, &rows)))
}

/// PATCH /profiles/:id/configs — Bind a verifier configuration.
///
/// Binds into the base row when it is still unbound; otherwise appends a
/// new row. A profile with no rows is created on the fly.
#[utoipa::path(
    patch,
    path = "/profiles/{profile_id}/configs",
    params(("profile_id" = String, Path, description = "Profile id")),
    request_body = AddConfigRequest,
    responses(
        (status = 201, description = "Updated profile", body = ProfileView),
        (status = 409, description = "Binding already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
pub async fn add_config(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(profile_id): Path<String>,
    body: Result<Json<AddConfigRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProfileView>)> {
    require_role(&caller, UserRole::Orgadmin)?;
    let req = extract_validated_json(body)?;
    let config_id = req.config_id.trim();
    let version = req.version.trim();
    let updated_by = req.updated_by.trim();
    let now = Utc::now();

    let rows = db::profiles::rows_for_profile(&state.db, &profile_id).await?;
    let duplicate = rows.iter().any(|row| {
        row.config_id.as_deref() == Some(config_id) && row.version.as_deref() == Some(version)
    });
    if duplicate {
        return Err(AppError::Conflict(format!(
            "configuration {config_id}@{version} is already bound to profile '{profile_id}'"
        )));
    }

    match rows.iter().find(|row| row.config_id.is_none()) {
        Some(base) => {
            db::profiles::bind_config(&state.db, base.id, config_id, version, updated_by, now)
                .await?;
        }
        None => {
            db::profiles::insert_row(
                &state.db,
                &profile_id,
                Some(config_id),
                Some(version),
                updated_by,
                now,
            )
            .await?;
        }
    }

    let rows = db::profiles::rows_for_profile(&state.db, &profile_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileView::from_rows(&profile_id, &rows)),
    ))
}

/// PATCH /profiles/:id/configs/delete — Remove a configuration binding.
#[utoipa::path(
    patch,
    path = "/profiles/{profile_id}/configs/delete",
    params(("profile_id" = String, Path, description = "Profile id")),
    request_body = DeleteConfigRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 404, description = "Binding not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
pub async fn delete_config(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(profile_id): Path<String>,
    body: Result<Json<DeleteConfigRequest>, JsonRejection>,
) -> AppResult<Json<ProfileView>> {
    require_role(&caller, UserRole::Orgadmin)?;
    let req = extract_validated_json(body)?;

    let deleted = db::profiles::delete_binding(
        &state.db,
        &profile_id,
        req.config_id.trim(),
        req.version.trim(),
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "configuration {}@{} is not bound to profile '{profile_id}'",
            req.config_id.trim(),
            req.version.trim()
        )));
    }

    let rows = db::profiles::rows_for_profile(&state.db, &profile_id).await?;
    Ok(Json(ProfileView::from_rows(&profile_id, &rows)))
}

/// DELETE /profiles/:id — Hard-delete a profile's rows.
#[utoipa::path(
    delete,
    path = "/profiles/{profile_id}",
    params(("profile_id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile deleted", body = ProfileDeletedResponse),
        (status = 403, description = "Master profile", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "profiles"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(profile_id): Path<String>,
) -> AppResult<Json<ProfileDeletedResponse>> {
    require_role(&caller, UserRole::Sysadmin)?;
    reject_master(&profile_id)?;

    let deleted = db::profiles::delete_all(&state.db, &profile_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "profile '{profile_id}' not found"
        )));
    }

    tracing::info!(profile_id = %profile_id, deleted, "profile deleted");
    Ok(Json(ProfileDeletedResponse {
        profile_id,
        deleted,
    }))
}
