//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Verifier Administration API",
        version = "0.3.2",
        description = "Multi-tenant administration of customers, organizations, and credentialed verifiers, with user onboarding against the cloud directory and verifiable-credential issuance.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Customers
        crate::routes::customers::create_customer,
        crate::routes::customers::list_customers,
        crate::routes::customers::get_customer,
        crate::routes::customers::update_customer,
        crate::routes::customers::delete_customer,
        // Organizations
        crate::routes::organizations::create_org,
        crate::routes::organizations::list_orgs,
        crate::routes::organizations::get_org,
        crate::routes::organizations::update_org,
        crate::routes::organizations::delete_org,
        // Verifiers
        crate::routes::verifiers::create_verifier,
        crate::routes::verifiers::list_verifiers,
        crate::routes::verifiers::get_verifier,
        crate::routes::verifiers::revoke_verifier,
        crate::routes::verifiers::get_credential,
        crate::routes::verifiers::reconcile_revocations,
        // Users
        crate::routes::users::login,
        crate::routes::users::onboard_user,
        crate::routes::users::offboard_user,
        crate::routes::users::list_users,
        crate::routes::users::reset_password,
        crate::routes::users::app_setup,
        // Profiles
        crate::routes::profiles::create_profile,
        crate::routes::profiles::get_profile,
        crate::routes::profiles::add_config,
        crate::routes::profiles::delete_config,
        crate::routes::profiles::delete_profile,
    ),
    components(schemas(
        // State record types
        crate::state::CustomerRecord,
        crate::state::AddressRecord,
        crate::state::OrganizationRecord,
        crate::state::VerifierRecord,
        crate::state::UserRecord,
        crate::state::ProfileConfiguration,
        crate::state::ProfileView,
        // Request/response DTOs
        crate::routes::customers::CreateCustomerRequest,
        crate::routes::customers::UpdateCustomerRequest,
        crate::routes::customers::CustomerCreatedResponse,
        crate::routes::organizations::AddressRequest,
        crate::routes::organizations::CreateOrgRequest,
        crate::routes::organizations::UpdateOrgRequest,
        crate::routes::organizations::OrgCreatedResponse,
        crate::routes::verifiers::CreateVerifierRequest,
        crate::routes::verifiers::VerifierCreatedResponse,
        crate::routes::users::LoginRequest,
        crate::routes::users::LoginResponse,
        crate::routes::users::OnboardUserRequest,
        crate::routes::users::UserSelector,
        crate::routes::users::UserView,
        crate::routes::users::OffboardResponse,
        crate::routes::users::AppSetupResponse,
        crate::routes::profiles::CreateProfileRequest,
        crate::routes::profiles::AddConfigRequest,
        crate::routes::profiles::DeleteConfigRequest,
        crate::routes::profiles::ProfileDeletedResponse,
        // Lifecycle
        crate::lifecycle::ReconcileSummary,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "customers", description = "Customer administration (sysadmin)"),
        (name = "organizations", description = "Organization administration (custadmin)"),
        (name = "verifiers", description = "Verifier credential lifecycle (orgadmin)"),
        (name = "users", description = "User onboarding against the cloud directory"),
        (name = "profiles", description = "Verifier configuration profiles"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
