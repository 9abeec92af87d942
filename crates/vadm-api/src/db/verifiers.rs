//! Verifier persistence operations.
//!
//! Verifier status is `active`, `revoked`, or `pending` — pending marks a
//! revocation the credential service has not confirmed yet. List queries
//! additionally filter out expired credentials.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vadm_core::VerifierStatus;

use crate::state::VerifierRecord;

const COLUMNS: &str = "verifier_id, org_id, customer_id, name, label, verifier_type, \
     config_id, config_name, did, credential, status, expiration_date, created_at, updated_at";

/// Insert a new verifier record.
pub async fn insert(pool: &PgPool, record: &VerifierRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO verifiers (verifier_id, org_id, customer_id, name, label, verifier_type,
            config_id, config_name, did, credential, status, expiration_date, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(record.verifier_id)
    .bind(record.org_id)
    .bind(record.customer_id)
    .bind(&record.name)
    .bind(&record.label)
    .bind(&record.verifier_type)
    .bind(&record.config_id)
    .bind(&record.config_name)
    .bind(&record.did)
    .bind(&record.credential)
    .bind(record.status.as_str())
    .bind(record.expiration_date)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a verifier by ID, regardless of status.
pub async fn find_by_id(
    pool: &PgPool,
    verifier_id: Uuid,
) -> Result<Option<VerifierRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, VerifierRow>(&format!(
        "SELECT {COLUMNS} FROM verifiers WHERE verifier_id = $1"
    ))
    .bind(verifier_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(VerifierRow::into_record))
}

/// List active, unexpired verifiers of an organization.
pub async fn list_active_unexpired(
    pool: &PgPool,
    org_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<VerifierRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VerifierRow>(&format!(
        "SELECT {COLUMNS} FROM verifiers
         WHERE org_id = $1 AND status = 'active'
           AND (expiration_date IS NULL OR expiration_date >= $2)
         ORDER BY created_at"
    ))
    .bind(org_id)
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VerifierRow::into_record).collect())
}

/// List all active verifiers of an organization, expired included.
/// Used by the organization delete cascade, which must revoke everything.
pub async fn list_active(pool: &PgPool, org_id: Uuid) -> Result<Vec<VerifierRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VerifierRow>(&format!(
        "SELECT {COLUMNS} FROM verifiers WHERE org_id = $1 AND status = 'active' ORDER BY created_at"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VerifierRow::into_record).collect())
}

/// List verifiers stuck in `pending` revocation, across all organizations.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<VerifierRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VerifierRow>(&format!(
        "SELECT {COLUMNS} FROM verifiers WHERE status = 'pending' ORDER BY updated_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VerifierRow::into_record).collect())
}

/// Update a verifier's status.
pub async fn set_status(
    pool: &PgPool,
    verifier_id: Uuid,
    status: VerifierStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE verifiers SET status = $1, updated_at = $2 WHERE verifier_id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(verifier_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct VerifierRow {
    verifier_id: Uuid,
    org_id: Uuid,
    customer_id: Uuid,
    name: String,
    label: Option<String>,
    verifier_type: String,
    config_id: Option<String>,
    config_name: Option<String>,
    did: Option<String>,
    credential: Option<String>,
    status: String,
    expiration_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VerifierRow {
    fn into_record(self) -> VerifierRecord {
        let status = self.status.parse().unwrap_or_else(|_| {
            tracing::error!(
                verifier_id = %self.verifier_id,
                status = %self.status,
                "unknown verifier status in database — defaulting to revoked"
            );
            VerifierStatus::Revoked
        });

        VerifierRecord {
            verifier_id: self.verifier_id,
            org_id: self.org_id,
            customer_id: self.customer_id,
            name: self.name,
            label: self.label,
            verifier_type: self.verifier_type,
            config_id: self.config_id,
            config_name: self.config_name,
            did: self.did,
            credential: self.credential,
            status,
            expiration_date: self.expiration_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
