//! Customer persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `customers` table.
//! Soft delete sets `status = 'inactive'`; inactive rows stay addressable
//! by primary key but drop out of lists and uniqueness checks.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vadm_core::EntityStatus;

use crate::state::CustomerRecord;

const COLUMNS: &str =
    "customer_id, name, label, url, billing_id, business_type, status, created_at, updated_at";

/// Insert a new customer record.
pub async fn insert(pool: &PgPool, record: &CustomerRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO customers (customer_id, name, label, url, billing_id, business_type, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.customer_id)
    .bind(&record.name)
    .bind(&record.label)
    .bind(&record.url)
    .bind(&record.billing_id)
    .bind(&record.business_type)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a customer by ID, regardless of status.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<CustomerRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {COLUMNS} FROM customers WHERE customer_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CustomerRow::into_record))
}

/// Whether an active customer with this name exists, excluding `exclude_id`
/// (so updates don't collide with the row being updated).
pub async fn active_name_exists(
    pool: &PgPool,
    name: &str,
    exclude_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM customers
         WHERE name = $1 AND status = 'active' AND ($2::uuid IS NULL OR customer_id <> $2)",
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// List active customers, oldest first.
pub async fn list_active(pool: &PgPool) -> Result<Vec<CustomerRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {COLUMNS} FROM customers WHERE status = 'active' ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CustomerRow::into_record).collect())
}

/// Update a customer's mutable fields.
pub async fn update(pool: &PgPool, record: &CustomerRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE customers
         SET name = $1, label = $2, url = $3, billing_id = $4, business_type = $5, updated_at = $6
         WHERE customer_id = $7",
    )
    .bind(&record.name)
    .bind(&record.label)
    .bind(&record.url)
    .bind(&record.billing_id)
    .bind(&record.business_type)
    .bind(record.updated_at)
    .bind(record.customer_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip a customer's status (soft delete / restore).
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: EntityStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE customers SET status = $1, updated_at = $2 WHERE customer_id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: Uuid,
    name: String,
    label: Option<String>,
    url: Option<String>,
    billing_id: Option<String>,
    business_type: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_record(self) -> CustomerRecord {
        let status = self.status.parse().unwrap_or_else(|_| {
            tracing::error!(
                customer_id = %self.customer_id,
                status = %self.status,
                "unknown customer status in database — defaulting to inactive"
            );
            EntityStatus::Inactive
        });

        CustomerRecord {
            customer_id: self.customer_id,
            name: self.name,
            label: self.label,
            url: self.url,
            billing_id: self.billing_id,
            business_type: self.business_type,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
