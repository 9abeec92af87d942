//! # Organization API
//!
//! Organizations live under a customer and carry an optional address.
//! All operations require at least the `custadmin` role, scoped to the
//! customer in the path.
//!
//! ## Endpoints
//!
//! - `POST /customers/:customer_id/orgs` — create organization
//! - `GET /customers/:customer_id/orgs` — list active organizations
//! - `GET /customers/:customer_id/orgs/:org_id` — get organization
//! - `PUT /customers/:customer_id/orgs/:org_id` — update organization
//! - `DELETE /customers/:customer_id/orgs/:org_id` — soft delete with cascade

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use vadm_core::{EntityStatus, UserRole, VerifierStatus};

use crate::auth::{require_customer_scope, require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::state::{AddressRecord, AppState, OrganizationRecord, UserRecord, VerifierRecord};
use crate::{db, lifecycle, routes, AppResult};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Address fields on organization create/update requests.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub street: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressRequest {
    fn into_record(self, address_id: Uuid) -> AddressRecord {
        AddressRecord {
            address_id,
            street: self.street,
            locality: self.locality,
            region: self.region,
            postal_code: self.postal_code,
            country: self.country,
        }
    }
}

/// Request to create a new organization.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrgRequest {
    /// Organization name, unique among the customer's active organizations.
    pub name: String,
    pub label: Option<String>,
    pub url: Option<String>,
    pub min_employees: Option<String>,
    pub max_employees: Option<String>,
    pub address: Option<AddressRequest>,
}

impl Validate for CreateOrgRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("name", &self.name)
    }
}

/// Request to update an organization. All fields optional.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrgRequest {
    pub name: Option<String>,
    pub label: Option<String>,
    pub url: Option<String>,
    pub min_employees: Option<String>,
    pub max_employees: Option<String>,
    pub address: Option<AddressRequest>,
}

impl Validate for UpdateOrgRequest {
    fn validate(&self) -> Result<(), String> {
        match self.name {
            Some(ref name) => require_non_blank("name", name),
            None => Ok(()),
        }
    }
}

/// Response for organization creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgCreatedResponse {
    pub org_id: Uuid,
    pub name: String,
    pub customer_id: Uuid,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the organizations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/customers/:customer_id/orgs",
            get(list_orgs).post(create_org),
        )
        .route(
            "/customers/:customer_id/orgs/:org_id",
            get(get_org).put(update_org).delete(delete_org),
        )
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Fetch a customer that must exist and be active, or 404.
async fn active_customer(state: &AppState, customer_id: Uuid) -> AppResult<()> {
    let customer = db::customers::find_by_id(&state.db, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("invalid customer".into()))?;
    if customer.status == EntityStatus::Inactive {
        return Err(AppError::NotFound("invalid customer".into()));
    }
    Ok(())
}

/// Fetch an organization that must belong to the customer, or 404.
async fn org_of_customer(
    state: &AppState,
    customer_id: Uuid,
    org_id: Uuid,
) -> AppResult<OrganizationRecord> {
    let org = db::organizations::find_by_id(&state.db, org_id)
        .await?
        .filter(|org| org.customer_id == customer_id)
        .ok_or_else(|| AppError::NotFound(format!("organization {org_id} not found")))?;
    Ok(org)
}

/// One step of the organization delete cascade.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OrgCascadeStep<'a> {
    RevokeVerifier(&'a VerifierRecord),
    OffboardUser(&'a UserRecord),
    Deactivate,
}

/// Order the organization delete cascade: every active verifier credential
/// is revoked before any user loses directory access, and the organization
/// row flips to inactive only after both.
pub(crate) fn org_cascade_steps<'a>(
    verifiers: &'a [VerifierRecord],
    users: &'a [UserRecord],
) -> Vec<OrgCascadeStep<'a>> {
    let mut steps = Vec::with_capacity(verifiers.len() + users.len() + 1);
    steps.extend(verifiers.iter().map(OrgCascadeStep::RevokeVerifier));
    steps.extend(users.iter().map(OrgCascadeStep::OffboardUser));
    steps.push(OrgCascadeStep::Deactivate);
    steps
}

/// Soft-delete an organization by executing [`org_cascade_steps`].
///
/// Shared with the customer delete cascade.
pub(crate) async fn deactivate_org(
    state: &AppState,
    org: &OrganizationRecord,
) -> AppResult<OrganizationRecord> {
    let verifiers = db::verifiers::list_active(&state.db, org.org_id).await?;
    let users = db::users::list_by_org(&state.db, &org.org_id.to_string()).await?;

    let mut deactivated_at = Utc::now();
    for step in org_cascade_steps(&verifiers, &users) {
        match step {
            OrgCascadeStep::RevokeVerifier(verifier) => {
                let status = lifecycle::revoke_verifier(state, verifier).await?;
                db::verifiers::set_status(&state.db, verifier.verifier_id, status, Utc::now())
                    .await?;
                if status == VerifierStatus::Pending {
                    tracing::warn!(
                        verifier_id = %verifier.verifier_id,
                        "verifier left pending during organization delete"
                    );
                }
            }
            OrgCascadeStep::OffboardUser(user) => {
                routes::users::offboard_cascade(state, user).await?;
            }
            OrgCascadeStep::Deactivate => {
                deactivated_at = Utc::now();
                db::organizations::set_status(
                    &state.db,
                    org.org_id,
                    EntityStatus::Inactive,
                    deactivated_at,
                )
                .await?;
            }
        }
    }

    tracing::info!(
        org_id = %org.org_id,
        verifiers = verifiers.len(),
        users = users.len(),
        "organization deactivated"
    );

    let mut updated = org.clone();
    updated.status = EntityStatus::Inactive;
    updated.updated_at = deactivated_at;
    Ok(updated)
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /customers/:customer_id/orgs — Create a new organization.
#[utoipa::path(
    post,
    path = "/customers/{customer_id}/orgs",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    request_body = CreateOrgRequest,
    responses(
        (status = 201, description = "Organization created", body = OrgCreatedResponse),
        (status = 404, description = "Invalid customer", body = crate::error::ErrorBody),
        (status = 409, description = "Name already in use", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn create_org(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(customer_id): Path<Uuid>,
    body: Result<Json<CreateOrgRequest>, JsonRejection>,
) -> AppResult<(axum::http::StatusCode, Json<OrgCreatedResponse>)> {
    require_role(&caller, UserRole::Custadmin)?;
    require_customer_scope(&caller, customer_id)?;
    let req = extract_validated_json(body)?;

    active_customer(&state, customer_id).await?;

    let name = req.name.trim().to_string();
    if db::organizations::active_name_exists(&state.db, customer_id, &name, None).await? {
        return Err(AppError::Conflict(format!(
            "organization name '{name}' is already in use"
        )));
    }

    let now = Utc::now();
    let record = OrganizationRecord {
        org_id: Uuid::new_v4(),
        customer_id,
        name,
        label: req.label,
        url: req.url,
        min_employees: req.min_employees,
        max_employees: req.max_employees,
        status: EntityStatus::Active,
        address: req.address.map(|a| a.into_record(Uuid::new_v4())),
        created_at: now,
        updated_at: now,
    };
    db::organizations::insert(&state.db, &record).await?;

    tracing::info!(org_id = %record.org_id, customer_id = %customer_id, "organization created");
    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrgCreatedResponse {
            org_id: record.org_id,
            name: record.name,
            customer_id,
        }),
    ))
}

/// GET /customers/:customer_id/orgs — List a customer's active organizations.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/orgs",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Active organizations", body = [OrganizationRecord]),
    ),
    tag = "organizations"
)]
pub async fn list_orgs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrganizationRecord>>> {
    require_role(&caller, UserRole::Custadmin)?;
    require_customer_scope(&caller, customer_id)?;
    let orgs = db::organizations::list_active(&state.db, customer_id).await?;
    Ok(Json(orgs))
}

/// GET /customers/:customer_id/orgs/:org_id — Fetch an organization.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/orgs/{org_id}",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
    ),
    responses(
        (status = 200, description = "Organization", body = OrganizationRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn get_org(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<OrganizationRecord>> {
    require_role(&caller, UserRole::Custadmin)?;
    require_customer_scope(&caller, customer_id)?;
    let org = org_of_customer(&state, customer_id, org_id).await?;
    Ok(Json(org))
}

/// PUT /customers/:customer_id/orgs/:org_id — Partially update an organization.
#[utoipa::path(
    put,
    path = "/customers/{customer_id}/orgs/{org_id}",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
    ),
    request_body = UpdateOrgRequest,
    responses(
        (status = 200, description = "Updated organization", body = OrganizationRecord),
        (status = 400, description = "Organization is inactive", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name already in use", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn update_org(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<UpdateOrgRequest>, JsonRejection>,
) -> AppResult<Json<OrganizationRecord>> {
    require_role(&caller, UserRole::Custadmin)?;
    require_customer_scope(&caller, customer_id)?;
    let req = extract_validated_json(body)?;

    active_customer(&state, customer_id).await?;
    let mut record = org_of_customer(&state, customer_id, org_id).await?;
    if record.status == EntityStatus::Inactive {
        return Err(AppError::BadRequest(
            "cannot update an inactive organization".into(),
        ));
    }

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if db::organizations::active_name_exists(&state.db, customer_id, &name, Some(org_id))
            .await?
        {
            return Err(AppError::Conflict(format!(
                "organization name '{name}' is already in use"
            )));
        }
        record.name = name;
    }
    if req.label.is_some() {
        record.label = req.label;
    }
    if req.url.is_some() {
        record.url = req.url;
    }
    if req.min_employees.is_some() {
        record.min_employees = req.min_employees;
    }
    if req.max_employees.is_some() {
        record.max_employees = req.max_employees;
    }
    if let Some(address) = req.address {
        // Keep the existing address id when updating in place.
        let address_id = record
            .address
            .as_ref()
            .map(|a| a.address_id)
            .unwrap_or_else(Uuid::new_v4);
        record.address = Some(address.into_record(address_id));
    }
    record.updated_at = Utc::now();

    db::organizations::update(&state.db, &record).await?;
    Ok(Json(record))
}

/// DELETE /customers/:customer_id/orgs/:org_id — Soft-delete an organization.
///
/// Cascades: revokes every active verifier of the organization, offboards
/// its users, then marks it inactive. Deleting an already-inactive
/// organization is a no-op.
#[utoipa::path(
    delete,
    path = "/customers/{customer_id}/orgs/{org_id}",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        ("org_id" = Uuid, Path, description = "Organization id"),
    ),
    responses(
        (status = 200, description = "Organization deactivated", body = OrganizationRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn delete_org(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((customer_id, org_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<OrganizationRecord>> {
    require_role(&caller, UserRole::Custadmin)?;
    require_customer_scope(&caller, customer_id)?;

    active_customer(&state, customer_id).await?;
    let org = org_of_customer(&state, customer_id, org_id).await?;
    if org.status == EntityStatus::Inactive {
        return Ok(Json(org));
    }

    let updated = deactivate_org(&state, &org).await?;
    Ok(Json(updated))
}
