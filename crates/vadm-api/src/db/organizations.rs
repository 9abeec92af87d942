//! Organization and address persistence operations.
//!
//! Organizations carry an optional 1:1 address; reads use a LEFT JOIN so
//! one query returns the organization with its address attached.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vadm_core::EntityStatus;

use crate::state::{AddressRecord, OrganizationRecord};

const JOINED_COLUMNS: &str = "o.org_id, o.customer_id, o.name, o.label, o.url, \
     o.min_employees, o.max_employees, o.status, o.created_at, o.updated_at, \
     a.address_id, a.street, a.locality, a.region, a.postal_code, a.country";

/// Insert a new organization and, when present, its address.
pub async fn insert(pool: &PgPool, record: &OrganizationRecord) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO organizations (org_id, customer_id, name, label, url, min_employees, max_employees, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(record.org_id)
    .bind(record.customer_id)
    .bind(&record.name)
    .bind(&record.label)
    .bind(&record.url)
    .bind(&record.min_employees)
    .bind(&record.max_employees)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *tx)
    .await?;

    if let Some(address) = &record.address {
        insert_address(&mut tx, record.org_id, address).await?;
    }

    tx.commit().await
}

async fn insert_address(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    org_id: Uuid,
    address: &AddressRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO addresses (address_id, org_id, street, locality, region, postal_code, country)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(address.address_id)
    .bind(org_id)
    .bind(&address.street)
    .bind(&address.locality)
    .bind(&address.region)
    .bind(&address.postal_code)
    .bind(&address.country)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Fetch an organization by ID with its address, regardless of status.
pub async fn find_by_id(
    pool: &PgPool,
    org_id: Uuid,
) -> Result<Option<OrganizationRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, OrgRow>(&format!(
        "SELECT {JOINED_COLUMNS} FROM organizations o
         LEFT JOIN addresses a ON a.org_id = o.org_id
         WHERE o.org_id = $1"
    ))
    .bind(org_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(OrgRow::into_record))
}

/// Whether an active organization of the customer already uses this name,
/// excluding `exclude_id`.
pub async fn active_name_exists(
    pool: &PgPool,
    customer_id: Uuid,
    name: &str,
    exclude_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM organizations
         WHERE customer_id = $1 AND name = $2 AND status = 'active'
           AND ($3::uuid IS NULL OR org_id <> $3)",
    )
    .bind(customer_id)
    .bind(name)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// List active organizations of a customer with their addresses.
pub async fn list_active(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<OrganizationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrgRow>(&format!(
        "SELECT {JOINED_COLUMNS} FROM organizations o
         LEFT JOIN addresses a ON a.org_id = o.org_id
         WHERE o.customer_id = $1 AND o.status = 'active'
         ORDER BY o.created_at"
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(OrgRow::into_record).collect())
}

/// Update an organization's mutable fields and upsert its address.
pub async fn update(pool: &PgPool, record: &OrganizationRecord) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE organizations
         SET name = $1, label = $2, url = $3, min_employees = $4, max_employees = $5, updated_at = $6
         WHERE org_id = $7",
    )
    .bind(&record.name)
    .bind(&record.label)
    .bind(&record.url)
    .bind(&record.min_employees)
    .bind(&record.max_employees)
    .bind(record.updated_at)
    .bind(record.org_id)
    .execute(&mut *tx)
    .await?;

    if let Some(address) = &record.address {
        let updated = sqlx::query(
            "UPDATE addresses
             SET street = $1, locality = $2, region = $3, postal_code = $4, country = $5
             WHERE org_id = $6",
        )
        .bind(&address.street)
        .bind(&address.locality)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(record.org_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            insert_address(&mut tx, record.org_id, address).await?;
        }
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Flip an organization's status (soft delete / restore).
pub async fn set_status(
    pool: &PgPool,
    org_id: Uuid,
    status: EntityStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE organizations SET status = $1, updated_at = $2 WHERE org_id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(org_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping (organization LEFT JOIN address).
#[derive(sqlx::FromRow)]
struct OrgRow {
    org_id: Uuid,
    customer_id: Uuid,
    name: String,
    label: Option<String>,
    url: Option<String>,
    min_employees: Option<String>,
    max_employees: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    address_id: Option<Uuid>,
    street: Option<String>,
    locality: Option<String>,
    region: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

impl OrgRow {
    fn into_record(self) -> OrganizationRecord {
        let status = self.status.parse().unwrap_or_else(|_| {
            tracing::error!(
                org_id = %self.org_id,
                status = %self.status,
                "unknown organization status in database — defaulting to inactive"
            );
            EntityStatus::Inactive
        });

        let address = self.address_id.map(|address_id| AddressRecord {
            address_id,
            street: self.street,
            locality: self.locality,
            region: self.region,
            postal_code: self.postal_code,
            country: self.country,
        });

        OrganizationRecord {
            org_id: self.org_id,
            customer_id: self.customer_id,
            name: self.name,
            label: self.label,
            url: self.url,
            min_employees: self.min_employees,
            max_employees: self.max_employees,
            status,
            address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
