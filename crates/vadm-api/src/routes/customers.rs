//! # Customer API
//!
//! Top of the tenant hierarchy. All operations require the `sysadmin` role.
//!
//! ## Endpoints
//!
//! - `POST /customers` — register customer
//! - `GET /customers` — list active customers
//! - `GET /customers/:id` — get customer
//! - `PUT /customers/:id` — update customer
//! - `DELETE /customers/:id` — soft delete with cascade

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use vadm_core::{EntityStatus, UserRole};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::state::{AppState, CustomerRecord, OrganizationRecord, UserRecord};
use crate::{db, routes, AppResult};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to register a new customer.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Customer name, unique among active customers.
    pub name: String,
    pub label: Option<String>,
    pub url: Option<String>,
    pub billing_id: Option<String>,
    pub business_type: Option<String>,
}

impl Validate for CreateCustomerRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("name", &self.name)
    }
}

/// Request to update a customer. All fields optional.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub label: Option<String>,
    pub url: Option<String>,
    pub billing_id: Option<String>,
    pub business_type: Option<String>,
}

impl Validate for UpdateCustomerRequest {
    fn validate(&self) -> Result<(), String> {
        match self.name {
            Some(ref name) => require_non_blank("name", name),
            None => Ok(()),
        }
    }
}

/// Response for customer creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreatedResponse {
    pub customer_id: Uuid,
    pub name: String,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:customer_id",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
}

// ── Helpers ─────────────────────────────────────────────────────────

/// One step of the customer delete cascade.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CustomerCascadeStep<'a> {
    OffboardUser(&'a UserRecord),
    DeactivateOrg(&'a OrganizationRecord),
    Deactivate,
}

/// Order the customer delete cascade: customer-level users are offboarded
/// first, then each active organization runs its own cascade (verifier
/// revocation, org-user offboarding), and the customer row flips to
/// inactive only after both.
pub(crate) fn customer_cascade_steps<'a>(
    users: &'a [UserRecord],
    orgs: &'a [OrganizationRecord],
) -> Vec<CustomerCascadeStep<'a>> {
    let mut steps = Vec::with_capacity(users.len() + orgs.len() + 1);
    steps.extend(users.iter().map(CustomerCascadeStep::OffboardUser));
    steps.extend(orgs.iter().map(CustomerCascadeStep::DeactivateOrg));
    steps.push(CustomerCascadeStep::Deactivate);
    steps
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /customers — Register a new customer.
#[utoipa::path(
    post,
    path = "/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerCreatedResponse),
        (status = 409, description = "Name already in use", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> AppResult<(axum::http::StatusCode, Json<CustomerCreatedResponse>)> {
    require_role(&caller, UserRole::Sysadmin)?;
    let req = extract_validated_json(body)?;
    let name = req.name.trim().to_string();

    if db::customers::active_name_exists(&state.db, &name, None).await? {
        return Err(AppError::Conflict(format!(
            "customer name '{name}' is already in use"
        )));
    }

    let now = Utc::now();
    let record = CustomerRecord {
        customer_id: Uuid::new_v4(),
        name,
        label: req.label,
        url: req.url,
        billing_id: req.billing_id,
        business_type: req.business_type,
        status: EntityStatus::Active,
        created_at: now,
        updated_at: now,
    };
    db::customers::insert(&state.db, &record).await?;

    tracing::info!(customer_id = %record.customer_id, "customer created");
    Ok((
        axum::http::StatusCode::CREATED,
        Json(CustomerCreatedResponse {
            customer_id: record.customer_id,
            name: record.name,
        }),
    ))
}

/// GET /customers — List active customers.
#[utoipa::path(
    get,
    path = "/customers",
    responses(
        (status = 200, description = "Active customers", body = [CustomerRecord]),
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> AppResult<Json<Vec<CustomerRecord>>> {
    require_role(&caller, UserRole::Sysadmin)?;
    let customers = db::customers::list_active(&state.db).await?;
    Ok(Json(customers))
}

/// GET /customers/:id — Fetch a customer regardless of status.
#[utoipa::path(
    get,
    path = "/customers/{customer_id}",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = CustomerRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerRecord>> {
    require_role(&caller, UserRole::Sysadmin)?;
    let record = db::customers::find_by_id(&state.db, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id} not found")))?;
    Ok(Json(record))
}

/// PUT /customers/:id — Partially update a customer.
#[utoipa::path(
    put,
    path = "/customers/{customer_id}",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Updated customer", body = CustomerRecord),
        (status = 400, description = "Customer is inactive", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name already in use", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(customer_id): Path<Uuid>,
    body: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> AppResult<Json<CustomerRecord>> {
    require_role(&caller, UserRole::Sysadmin)?;
    let req = extract_validated_json(body)?;

    let mut record = db::customers::find_by_id(&state.db, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id} not found")))?;
    if record.status == EntityStatus::Inactive {
        return Err(AppError::BadRequest(
            "cannot update an inactive customer".into(),
        ));
    }

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if db::customers::active_name_exists(&state.db, &name, Some(customer_id)).await? {
            return Err(AppError::Conflict(format!(
                "customer name '{name}' is already in use"
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
    if req.billing_id.is_some() {
        record.billing_id = req.billing_id;
    }
    if req.business_type.is_some() {
        record.business_type = req.business_type;
    }
    record.updated_at = Utc::now();

    db::customers::update(&state.db, &record).await?;
    Ok(Json(record))
}

/// DELETE /customers/:id — Soft-delete a customer.
///
/// Cascades: offboards every user of the customer, soft-deletes each
/// active organization (revoking its verifiers), then marks the customer
/// inactive. Deleting an already-inactive customer is a no-op.
#[utoipa::path(
    delete,
    path = "/customers/{customer_id}",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deactivated", body = CustomerRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerRecord>> {
    require_role(&caller, UserRole::Sysadmin)?;

    let mut record = db::customers::find_by_id(&state.db, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id} not found")))?;
    if record.status == EntityStatus::Inactive {
        return Ok(Json(record));
    }

    let users = db::users::list_by_customer(&state.db, &customer_id.to_string()).await?;
    let orgs = db::organizations::list_active(&state.db, customer_id).await?;

    let mut deactivated_at = Utc::now();
    for step in customer_cascade_steps(&users, &orgs) {
        match step {
            CustomerCascadeStep::OffboardUser(user) => {
                routes::users::offboard_cascade(&state, user).await?;
            }
            CustomerCascadeStep::DeactivateOrg(org) => {
                routes::organizations::deactivate_org(&state, org).await?;
            }
            CustomerCascadeStep::Deactivate => {
                deactivated_at = Utc::now();
                db::customers::set_status(
                    &state.db,
                    customer_id,
                    EntityStatus::Inactive,
                    deactivated_at,
                )
                .await?;
            }
        }
    }
    record.status = EntityStatus::Inactive;
    record.updated_at = deactivated_at;

    tracing::info!(
        customer_id = %customer_id,
        users = users.len(),
        orgs = orgs.len(),
        "customer deactivated"
    );
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user_id: id.to_string(),
            role: UserRole::Custadmin,
            customer_id: None,
            org_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn org(name: &str) -> OrganizationRecord {
        let now = Utc::now();
        OrganizationRecord {
            org_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            name: name.to_string(),
            label: None,
            url: None,
            min_employees: None,
            max_employees: None,
            status: EntityStatus::Active,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn cascade_offboards_users_before_deactivating_orgs() {
        let users = vec![user("u1"), user("u2")];
        let orgs = vec![org("clinic")];

        let steps = customer_cascade_steps(&users, &orgs);
        assert_eq!(steps.len(), 4);
        assert!(matches!(steps[0], CustomerCascadeStep::OffboardUser(u) if u.user_id == "u1"));
        assert!(matches!(steps[1], CustomerCascadeStep::OffboardUser(u) if u.user_id == "u2"));
        assert!(
            matches!(steps[2], CustomerCascadeStep::DeactivateOrg(o) if o.org_id == orgs[0].org_id)
        );
        assert!(matches!(steps[3], CustomerCascadeStep::Deactivate));
    }

    #[test]
    fn cascade_deactivates_last_even_when_empty() {
        let steps = customer_cascade_steps(&[], &[]);
        assert_eq!(steps.len(), 1);
        assert!(matches!(steps[0], CustomerCascadeStep::Deactivate));
    }
}
