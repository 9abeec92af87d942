//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{customer_id}:{org_id}:{secret}   — scoped format
//! Bearer {secret}                                  — legacy format (treated as sysadmin)
//! ```
//!
//! `customer_id` and `org_id` may be empty or `*` for wildcard scope.
//! Roles are ordered `orgadmin < custadmin < sysadmin`; a higher role
//! satisfies any lower minimum.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use vadm_core::UserRole;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, extracted from the auth context
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role.
    pub role: UserRole,
    /// Customer the caller is scoped to. `None` means wildcard — the
    /// caller may act on any customer.
    pub customer_id: Option<Uuid>,
    /// Organization the caller is scoped to. `None` means wildcard.
    pub org_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: UserRole) -> bool {
        self.role >= minimum
    }

    /// Whether the caller may act on the given customer.
    pub fn can_access_customer(&self, customer_id: Uuid) -> bool {
        match self.customer_id {
            None => true,
            Some(scoped) => scoped == customer_id,
        }
    }

    /// Whether the caller may act on the given organization.
    pub fn can_access_org(&self, org_id: Uuid) -> bool {
        match self.org_id {
            None => true,
            Some(scoped) => scoped == org_id,
        }
    }
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: UserRole) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

/// Check that the caller's scope covers the given customer.
pub fn require_customer_scope(caller: &CallerIdentity, customer_id: Uuid) -> Result<(), AppError> {
    if caller.can_access_customer(customer_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "caller is not scoped to this customer".into(),
        ))
    }
}

/// Check that the caller's scope covers the given organization.
pub fn require_org_scope(caller: &CallerIdentity, org_id: Uuid) -> Result<(), AppError> {
    if caller.can_access_org(org_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "caller is not scoped to this organization".into(),
        ))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// Prevents timing side-channels that could reveal token length or prefix.
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Dummy comparison to keep timing constant regardless of length match.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Wildcard identity with full access, used when auth is disabled.
fn sysadmin_identity() -> CallerIdentity {
    CallerIdentity {
        role: UserRole::Sysadmin,
        customer_id: None,
        org_id: None,
    }
}

fn parse_scope_segment(segment: &str, label: &str) -> Result<Option<Uuid>, String> {
    if segment.is_empty() || segment == vadm_core::WILDCARD_SCOPE {
        return Ok(None);
    }
    segment
        .parse::<Uuid>()
        .map(Some)
        .map_err(|e| format!("invalid {label}: {e}"))
}

/// Parse the bearer token in format `{role}:{customer_id}:{org_id}:{secret}`
/// or `{secret}` (legacy).
///
/// Legacy tokens (without role prefix) are treated as `sysadmin` for backward
/// compatibility with existing deployments.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(4, ':').collect();

    match parts.len() {
        // Legacy format: just the secret.
        1 => {
            if constant_time_token_eq(provided, expected_secret) {
                Ok(sysadmin_identity())
            } else {
                Err("invalid bearer token".into())
            }
        }
        // Scoped format: role:customer_id:org_id:secret (scopes may be empty).
        4 => {
            let role_str = parts[0];
            let customer_str = parts[1];
            let org_str = parts[2];
            let secret = parts[3];

            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role: UserRole = role_str
                .parse()
                .map_err(|_| format!("unknown role: {role_str}"))?;
            let customer_id = parse_scope_segment(customer_str, "customer_id")?;
            let org_id = parse_scope_segment(org_str, "org_id")?;

            // A scoped role without the scope it requires is a malformed token.
            if role.requires_customer() && customer_id.is_none() {
                return Err(format!("role '{}' requires a customer scope", role.as_str()));
            }
            if role.requires_org() && org_id.is_none() {
                return Err(format!("role '{}' requires an org scope", role.as_str()));
            }

            Ok(CallerIdentity {
                role,
                customer_id,
                org_id,
            })
        }
        _ => Err("invalid token format — expected {role}:{customer_id}:{org_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token to extract `CallerIdentity` (role + tenant scope) and
/// injects it into request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, all requests are allowed with `sysadmin`
/// identity (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled — inject sysadmin identity for full access.
            request.extensions_mut().insert(sysadmin_identity());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
