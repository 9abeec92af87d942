//! User persistence operations.
//!
//! The `users` table binds identity-provider subject ids to a local role
//! and tenant scope. Wildcard scope is stored as the literal `*` and
//! translated to `None` on read so it never leaks into API output.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use vadm_core::{UserRole, WILDCARD_SCOPE};

use crate::state::UserRecord;

const COLUMNS: &str = "user_id, role, customer_id, org_id, created_at, updated_at";

fn scope_to_db(scope: &Option<String>) -> &str {
    scope.as_deref().unwrap_or(WILDCARD_SCOPE)
}

fn scope_from_db(scope: String) -> Option<String> {
    if scope == WILDCARD_SCOPE {
        None
    } else {
        Some(scope)
    }
}

/// Insert a new user row.
pub async fn insert(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (user_id, role, customer_id, org_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&record.user_id)
    .bind(record.role.as_str())
    .bind(scope_to_db(&record.customer_id))
    .bind(scope_to_db(&record.org_id))
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a user by their identity-provider subject id.
pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    let row =
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(UserRow::into_record))
}

/// Delete a user row. Returns whether a row was deleted.
pub async fn delete(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List users filtered by tenant scope. At least one filter must be given;
/// the route layer enforces that.
pub async fn list_by_scope(
    pool: &PgPool,
    customer_id: Option<&str>,
    org_id: Option<&str>,
) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {COLUMNS} FROM users
         WHERE ($1::varchar IS NULL OR customer_id = $1)
           AND ($2::varchar IS NULL OR org_id = $2)
         ORDER BY created_at"
    ))
    .bind(customer_id)
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UserRow::into_record).collect())
}

/// List users of a customer, for the customer delete cascade.
pub async fn list_by_customer(
    pool: &PgPool,
    customer_id: &str,
) -> Result<Vec<UserRecord>, sqlx::Error> {
    list_by_scope(pool, Some(customer_id), None).await
}

/// List users of an organization, for the organization delete cascade.
pub async fn list_by_org(pool: &PgPool, org_id: &str) -> Result<Vec<UserRecord>, sqlx::Error> {
    list_by_scope(pool, None, Some(org_id)).await
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    role: String,
    customer_id: String,
    org_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> UserRecord {
        let role = self.role.parse().unwrap_or_else(|_| {
            tracing::error!(
                user_id = %self.user_id,
                role = %self.role,
                "unknown user role in database — defaulting to orgadmin"
            );
            UserRole::Orgadmin
        });

        UserRecord {
            user_id: self.user_id,
            role,
            customer_id: scope_from_db(self.customer_id),
            org_id: scope_from_db(self.org_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
