//! # Verifier API
//!
//! Verifiers are the credential-holding endpoints of the hierarchy. Creating
//! one issues a verifiable credential through the external credential
//! service; deleting one revokes it. Operations require at least the
//! `orgadmin` role scoped to the organization in the path.
//!
//! ## Endpoints
//!
//! - `POST /customers/:customer_id/orgs/:org_id/verifiers` — create + issue
//! - `GET .../verifiers` — list active, unexpired verifiers
//! - `GET .../verifiers/:verifier_id` — get verifier
//! - `DELETE .../verifiers/:verifier_id` — revoke credential
//! - `GET .../verifiers/:verifier_id/credential?type=json|qr` — fetch credential
//! - `POST /verifiers/reconcile-revocations` — sysadmin reconciliation sweep

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use vadm_core::{expiration_from_days, CredentialFormat, EntityStatus, UserRole, VerifierStatus};
use vadm_credential_client::qr::credential_qr_png;

use crate::auth::{require_customer_scope, require_org_scope, require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::lifecycle::{self, ReconcileSummary};
use crate::state::{AppState, VerifierRecord};
use crate::{db, AppResult};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to create a new verifier and issue its credential.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVerifierRequest {
    pub name: String,
    pub label: Option<String>,
    /// Kind of verifier, stamped into the credential subject.
    pub verifier_type: String,
    pub config_id: Option<String>,
    pub config_name: Option<String>,
    /// Credential validity in days. Falls back to the configured default.
    pub days_till_expiry: Option<i64>,
}

impl Validate for CreateVerifierRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("name", &self.name)?;
        require_non_blank("verifierType", &self.verifier_type)?;
        if let Some(days) = self.days_till_expiry {
            if days <= 0 {
                return Err("daysTillExpiry must be positive".to_string());
            }
        }
        Ok(())
    }
}

/// Response for verifier creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifierCreatedResponse {
    pub verifier_id: Uuid,
    pub name: String,
    pub customer_id: Uuid,
    pub org_id: Uuid,
}

/// Query parameters for the credential endpoint.
#[derive(Debug, Deserialize)]
pub struct CredentialQuery {
    /// Output format: `json` or `qr` (default).
    #[serde(rename = "type")]
    pub format: Option<String>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the verifiers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/customers/:customer_id/orgs/:org_id/verifiers",
            get(list_verifiers).post(create_verifier),
        )
        .route(
            "/customers/:customer_id/orgs/:org_id/verifiers/:verifier_id",
            get(get_verifier).delete(revoke_verifier),
        )
        .route(
            "/customers/:customer_id/orgs/:org_id/verifiers/:verifier_id/credential",
            get(get_credential),
        )
        .route(
            "/verifiers/reconcile-revocations",
            post(reconcile_revocations),
        )
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Check caller role and scope against the path's customer and org.
fn check_scopes(caller: &CallerIdentity, customer_id: Uuid, org_id: Uuid) -> AppResult<()> {
    require_role(caller, UserRole::Orgadmin)?;
    require_customer_scope(caller, customer_id)?;
    require_org_scope(caller, org_id)?;
    Ok(())
}

/// The organization must exist under the customer and be active, or 404.
async fn active_org(state: &AppState, customer_id: Uuid, org_id: Uuid) -> AppResult<()> {
    let org = db::organizations::find_by_id(&state.db, org_id)
        .await?
        .filter(|org| org.customer_id == customer_id)
        .ok_or_else(|| AppError::NotFound("invalid organization".into()))?;
    if org.status == EntityStatus::Inactive {
        return Err(AppError::NotFound("invalid organization".into()));
    }
    Ok(())
}

/// Fetch a verifier that must belong to the organization, or 404.
async fn verifier_of_org(
    state: &AppState,
    org_id: Uuid,
    verifier_id: Uuid,
) -> AppResult<VerifierRecord> {
    let verifier = db::verifiers::find_by_id(&state.db, verifier_id)
        .await?
        .filter(|v| v.org_id == org_id)
        .ok_or_else(|| AppError::NotFound(format!("verifier {verifier_id} not found")))?;
    Ok(verifier)
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST .../verifiers — Create a verifier and issue its credential.
#[utoipa::path(
    post,
    path = "/customers/{customer_id}/orgs/{org_id}/verifiers",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
    ),
    request_body = CreateVerifierRequest,
    responses(
        (status = 201, description = "Verifier created", body = VerifierCreatedResponse),
        (status = 404, description = "Invalid organization", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 503, description = "Credential service unavailable", body = crate::error::ErrorBody),
    ),
    tag = "verifiers"
)]
pub async fn create_verifier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<CreateVerifierRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<VerifierCreatedResponse>)> {
    check_scopes(&caller, customer_id, org_id)?;
    let req = extract_validated_json(body)?;

    active_org(&state, customer_id, org_id).await?;
    let customer = db::customers::find_by_id(&state.db, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("invalid customer".into()))?;
    let org = db::organizations::find_by_id(&state.db, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("invalid organization".into()))?;

    let now = Utc::now();
    let days = req.days_till_expiry.unwrap_or(state.config.verifier_expiry_days);
    let expiration = expiration_from_days(now, days);

    let mut record = VerifierRecord {
        verifier_id: Uuid::new_v4(),
        org_id,
        customer_id,
        name: req.name.trim().to_string(),
        label: req.label,
        verifier_type: req.verifier_type,
        config_id: req.config_id,
        config_name: req.config_name,
        did: None,
        credential: None,
        status: VerifierStatus::Active,
        expiration_date: Some(expiration),
        created_at: now,
        updated_at: now,
    };

    let credentials = state.credentials()?;
    let token = lifecycle::service_token(&state).await?;
    let subject = lifecycle::credential_subject(&customer, &org, &record);
    let txn_id = Uuid::new_v4().to_string();
    let issued = credentials
        .issue_verifier_credential(&token, &txn_id, &subject, expiration)
        .await?;

    record.did = Some(issued.did);
    record.credential = Some(issued.document.to_string());
    db::verifiers::insert(&state.db, &record).await?;

    tracing::info!(verifier_id = %record.verifier_id, org_id = %org_id, "verifier created");
    Ok((
        StatusCode::CREATED,
        Json(VerifierCreatedResponse {
            verifier_id: record.verifier_id,
            name: record.name,
            customer_id,
            org_id,
        }),
    ))
}

/// GET .../verifiers — List the organization's active, unexpired verifiers.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/orgs/{org_id}/verifiers",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
    ),
    responses(
        (status = 200, description = "Active verifiers", body = [VerifierRecord]),
    ),
    tag = "verifiers"
)]
pub async fn list_verifiers(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<VerifierRecord>>> {
    check_scopes(&caller, customer_id, org_id)?;
    let verifiers = db::verifiers::list_active_unexpired(&state.db, org_id, Utc::now()).await?;
    Ok(Json(verifiers))
}

/// GET .../verifiers/:id — Fetch a verifier regardless of status.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/orgs/{org_id}/verifiers/{verifier_id}",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("verifier_id" = Uuid, Path, description = "Verifier id"),
    ),
    responses(
        (status = 200, description = "Verifier", body = VerifierRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "verifiers"
)]
pub async fn get_verifier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id, verifier_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<Json<VerifierRecord>> {
    check_scopes(&caller, customer_id, org_id)?;
    let verifier = verifier_of_org(&state, org_id, verifier_id).await?;
    Ok(Json(verifier))
}

/// DELETE .../verifiers/:id — Revoke a verifier's credential.
///
/// Expired credentials are revoked locally; otherwise the credential
/// service decides. Ambiguous failures park the verifier as `pending`
/// until the reconciliation sweep confirms.
#[utoipa::path(
    delete,
    path = "/customers/{customer_id}/orgs/{org_id}/verifiers/{verifier_id}",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("verifier_id" = Uuid, Path, description = "Verifier id"),
    ),
    responses(
        (status = 200, description = "Verifier revoked (or pending)", body = VerifierRecord),
        (status = 400, description = "Already revoked", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "verifiers"
)]
pub async fn revoke_verifier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id, verifier_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<Json<VerifierRecord>> {
    check_scopes(&caller, customer_id, org_id)?;

    active_org(&state, customer_id, org_id).await?;
    let mut verifier = verifier_of_org(&state, org_id, verifier_id).await?;
    if verifier.status == VerifierStatus::Revoked {
        return Err(AppError::BadRequest("verifier is already revoked".into()));
    }

    let status = lifecycle::revoke_verifier(&state, &verifier).await?;
    let now = Utc::now();
    db::verifiers::set_status(&state.db, verifier_id, status, now).await?;
    verifier.status = status;
    verifier.updated_at = now;
    Ok(Json(verifier))
}

/// GET .../verifiers/:id/credential — Fetch the stored credential.
///
/// `type=json` returns the raw credential document; `type=qr` (default)
/// renders it as a PNG QR code. Any other value is rejected with 422
/// instead of silently falling back to QR.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/orgs/{org_id}/verifiers/{verifier_id}/credential",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
        ("verifier_id" = Uuid, Path, description = "Verifier id"),
        ("type" = Option<String>, Query, description = "Output format: json or qr (default); any other value is rejected with 422"),
    ),
    responses(
        (status = 200, description = "Credential document or QR PNG"),
        (status = 404, description = "No active credential", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown format", body = crate::error::ErrorBody),
    ),
    tag = "verifiers"
)]
pub async fn get_credential(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id, verifier_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(query): Query<CredentialQuery>,
) -> AppResult<Response> {
    check_scopes(&caller, customer_id, org_id)?;

    let format = match query.format.as_deref() {
        Some(value) => value.parse::<CredentialFormat>()?,
        None => CredentialFormat::default(),
    };

    let verifier = verifier_of_org(&state, org_id, verifier_id).await?;
    if verifier.status != VerifierStatus::Active {
        return Err(AppError::NotFound(format!(
            "verifier {verifier_id} has no active credential"
        )));
    }
    let credential = verifier.credential.as_deref().ok_or_else(|| {
        AppError::NotFound(format!("verifier {verifier_id} has no active credential"))
    })?;

    match format {
        CredentialFormat::Json => {
            let document: serde_json::Value = serde_json::from_str(credential)
                .map_err(|e| AppError::Internal(format!("stored credential is not JSON: {e}")))?;
            Ok(Json(document).into_response())
        }
        CredentialFormat::Qr => {
            let png = credential_qr_png(credential)
                .map_err(|e| AppError::Internal(format!("QR rendering failed: {e}")))?;
            Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
        }
    }
}

/// POST /verifiers/reconcile-revocations — Re-check pending revocations.
#[utoipa::path(
    post,
    path = "/verifiers/reconcile-revocations",
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileSummary),
        (status = 503, description = "Credential service unavailable", body = crate::error::ErrorBody),
    ),
    tag = "verifiers"
)]
pub async fn reconcile_revocations(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> AppResult<Json<ReconcileSummary>> {
    require_role(&caller, UserRole::Sysadmin)?;
    let summary = lifecycle::reconcile_pending(&state).await?;
    Ok(Json(summary))
}
