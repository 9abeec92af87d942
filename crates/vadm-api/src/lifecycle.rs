//! # Verifier Credential Lifecycle
//!
//! Orchestration between the local verifier records and the external
//! credential service: issuance payload assembly, revocation outcome
//! classification, and reconciliation of pending revocations.
//!
//! The revocation flow is deliberately conservative. A revoke call that
//! fails ambiguously (service 400 or timeout) leaves the verifier in
//! `pending`: locally unusable, but re-checked against the service later
//! so the authoritative revocation state wins.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use vadm_core::VerifierStatus;
use vadm_credential_client::{CredentialApiError, VerifierCredentialData};

use crate::error::AppError;
use crate::state::{AppState, CustomerRecord, OrganizationRecord, VerifierRecord};
use crate::{db, AppResult};

/// Reason string recorded with every administrative revocation.
pub const REVOCATION_REASON: &str = "Revoked by verifier admin";

/// Outcome of a revoke call against the credential service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// The service recorded (or had already recorded) the revocation.
    Revoked,
    /// The call failed ambiguously; the revocation may or may not have
    /// been recorded. Reconciled later.
    Pending,
}

/// Classify a failed revoke call.
///
/// - The service rejecting a duplicate revocation means the credential is
///   already revoked — treat as success.
/// - A 400 or a transport timeout is ambiguous — park as pending.
/// - Anything else is unexpected and propagates as an error (`None`).
pub fn classify_revocation_failure(err: &CredentialApiError) -> Option<RevocationOutcome> {
    if err
        .body()
        .is_some_and(|body| body.contains("already exists"))
    {
        return Some(RevocationOutcome::Revoked);
    }
    if err.status() == Some(400) || err.is_timeout() {
        return Some(RevocationOutcome::Pending);
    }
    None
}

/// Assemble the credential subject for a verifier credential.
///
/// Display fields prefer the label over the name, matching what scanning
/// apps show to end users.
pub fn credential_subject(
    customer: &CustomerRecord,
    org: &OrganizationRecord,
    verifier: &VerifierRecord,
) -> VerifierCredentialData {
    VerifierCredentialData {
        credential_type: VerifierCredentialData::credential_type().to_string(),
        name: verifier.label.clone().unwrap_or_else(|| verifier.name.clone()),
        verifier_type: verifier.verifier_type.clone(),
        organization_id: org.org_id.to_string(),
        customer_id: customer.customer_id.to_string(),
        config_id: verifier.config_id.clone().unwrap_or_default(),
        config_name: verifier.config_name.clone().unwrap_or_default(),
        customer: customer.label.clone().unwrap_or_else(|| customer.name.clone()),
        organization: org.label.clone().unwrap_or_else(|| org.name.clone()),
    }
}

/// Obtain a service token for credential service calls.
///
/// The credential service authorizes against the same identity provider,
/// so the directory's client-credentials grant serves as the
/// service-to-service token.
pub async fn service_token(state: &AppState) -> AppResult<String> {
    let directory = state.directory()?;
    let tokens = directory.management_token().await?;
    Ok(tokens.access_token)
}

/// Revoke a verifier's credential against the external service and decide
/// the resulting local status.
///
/// Expired credentials are revoked locally without an external call — the
/// service already treats them as invalid.
pub async fn revoke_verifier(
    state: &AppState,
    verifier: &VerifierRecord,
) -> AppResult<VerifierStatus> {
    let expired = verifier
        .expiration_date
        .is_some_and(|exp| vadm_core::is_expired(exp, Utc::now()));
    if expired {
        tracing::info!(verifier_id = %verifier.verifier_id, "credential expired, revoking locally");
        return Ok(VerifierStatus::Revoked);
    }

    let did = verifier.did.as_deref().ok_or_else(|| {
        AppError::Internal(format!(
            "verifier {} has no credential DID to revoke",
            verifier.verifier_id
        ))
    })?;

    let credentials = state.credentials()?;
    let token = service_token(state).await?;

    match credentials
        .revoke_credential(&token, did, REVOCATION_REASON)
        .await
    {
        Ok(()) => Ok(VerifierStatus::Revoked),
        Err(err) => match classify_revocation_failure(&err) {
            Some(RevocationOutcome::Revoked) => {
                tracing::info!(verifier_id = %verifier.verifier_id, "revocation already recorded");
                Ok(VerifierStatus::Revoked)
            }
            Some(RevocationOutcome::Pending) => {
                tracing::warn!(
                    verifier_id = %verifier.verifier_id,
                    error = %err,
                    "revocation unconfirmed, parking verifier as pending"
                );
                Ok(VerifierStatus::Pending)
            }
            None => Err(err.into()),
        },
    }
}

/// Summary of a pending-revocation reconciliation run.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Pending verifiers examined.
    pub checked: usize,
    /// Verifiers flipped to revoked because the service confirmed.
    pub confirmed: usize,
}

/// Re-check every pending verifier against the credential service and flip
/// confirmed revocations to `revoked`. Unconfirmed ones stay pending for
/// the next run.
pub async fn reconcile_pending(state: &AppState) -> AppResult<ReconcileSummary> {
    let credentials = state.credentials()?;
    let token = service_token(state).await?;

    let pending = db::verifiers::list_pending(&state.db).await?;
    let checked = pending.len();
    let mut confirmed = 0;

    for verifier in pending {
        let Some(did) = verifier.did.as_deref() else {
            continue;
        };
        match credentials.is_revoked(&token, did).await {
            Ok(true) => {
                db::verifiers::set_status(
                    &state.db,
                    verifier.verifier_id,
                    VerifierStatus::Revoked,
                    Utc::now(),
                )
                .await?;
                confirmed += 1;
            }
            Ok(false) => {}
            Err(err) => {
                // One unreachable credential must not abort the sweep.
                tracing::warn!(
                    verifier_id = %verifier.verifier_id,
                    error = %err,
                    "revoke-status check failed, leaving verifier pending"
                );
            }
        }
    }

    tracing::info!(checked, confirmed, "pending revocation reconciliation complete");
    Ok(ReconcileSummary { checked, confirmed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use vadm_core::EntityStatus;

    fn api_error(status: u16, body: &str) -> CredentialApiError {
        CredentialApiError::Api {
            endpoint: "POST /credentials/revoke".into(),
            status,
            body: body.into(),
        }
    }

    #[test]
    fn duplicate_revocation_counts_as_revoked() {
        let err = api_error(409, r#"{"message":"revocation already exists"}"#);
        assert_eq!(
            classify_revocation_failure(&err),
            Some(RevocationOutcome::Revoked)
        );
    }

    #[test]
    fn bad_request_parks_as_pending() {
        let err = api_error(400, r#"{"message":"try again"}"#);
        assert_eq!(
            classify_revocation_failure(&err),
            Some(RevocationOutcome::Pending)
        );
    }

    #[test]
    fn server_error_propagates() {
        let err = api_error(500, "boom");
        assert_eq!(classify_revocation_failure(&err), None);
    }

    #[test]
    fn already_exists_wins_over_status() {
        // A 400 whose body names a duplicate is a confirmed revocation,
        // not an ambiguous failure.
        let err = api_error(400, "revocation already exists for this credential");
        assert_eq!(
            classify_revocation_failure(&err),
            Some(RevocationOutcome::Revoked)
        );
    }

    fn sample_customer() -> CustomerRecord {
        let now = Utc::now();
        CustomerRecord {
            customer_id: Uuid::new_v4(),
            name: "Acme Health".into(),
            label: Some("Acme".into()),
            url: None,
            billing_id: None,
            business_type: None,
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_org(customer_id: Uuid) -> OrganizationRecord {
        let now = Utc::now();
        OrganizationRecord {
            org_id: Uuid::new_v4(),
            customer_id,
            name: "Clinic East".into(),
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

    fn sample_verifier(customer_id: Uuid, org_id: Uuid) -> VerifierRecord {
        let now = Utc::now();
        VerifierRecord {
            verifier_id: Uuid::new_v4(),
            org_id,
            customer_id,
            name: "Front desk".into(),
            label: Some("Front Desk Scanner".into()),
            verifier_type: "scanner".into(),
            config_id: Some("cfg-1".into()),
            config_name: Some("default".into()),
            did: None,
            credential: None,
            status: VerifierStatus::Active,
            expiration_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn credential_subject_prefers_labels() {
        let customer = sample_customer();
        let org = sample_org(customer.customer_id);
        let verifier = sample_verifier(customer.customer_id, org.org_id);

        let subject = credential_subject(&customer, &org, &verifier);
        assert_eq!(subject.name, "Front Desk Scanner");
        assert_eq!(subject.customer, "Acme");
        // Org has no label, so the name is used.
        assert_eq!(subject.organization, "Clinic East");
        assert_eq!(subject.customer_id, customer.customer_id.to_string());
        assert_eq!(subject.config_id, "cfg-1");
    }

    #[test]
    fn credential_subject_falls_back_to_names() {
        let mut customer = sample_customer();
        customer.label = None;
        let org = sample_org(customer.customer_id);
        let mut verifier = sample_verifier(customer.customer_id, org.org_id);
        verifier.label = None;

        let subject = credential_subject(&customer, &org, &verifier);
        assert_eq!(subject.name, "Front desk");
        assert_eq!(subject.customer, "Acme Health");
    }
}
