//! Profile persistence operations.
//!
//! A profile is a group of rows sharing a `profile_id`; each row binds one
//! `(config_id, version)` pair. The base row created at profile creation
//! has a null config until the first binding claims it. Profiles are the
//! one entity that is hard-deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::state::ProfileRow;

const COLUMNS: &str = "id, profile_id, config_id, version, updated_by, created_at, updated_at";

/// All rows of a profile, in insertion order.
pub async fn rows_for_profile(
    pool: &PgPool,
    profile_id: &str,
) -> Result<Vec<ProfileRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Row>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE profile_id = $1 ORDER BY id"
    ))
    .bind(profile_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Row::into_record).collect())
}

/// Insert one profile row.
pub async fn insert_row(
    pool: &PgPool,
    profile_id: &str,
    config_id: Option<&str>,
    version: Option<&str>,
    updated_by: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO profiles (profile_id, config_id, version, updated_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(profile_id)
    .bind(config_id)
    .bind(version)
    .bind(updated_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bind a config to an existing unbound row (the base row).
pub async fn bind_config(
    pool: &PgPool,
    row_id: i64,
    config_id: &str,
    version: &str,
    updated_by: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE profiles SET config_id = $1, version = $2, updated_by = $3, updated_at = $4
         WHERE id = $5",
    )
    .bind(config_id)
    .bind(version)
    .bind(updated_by)
    .bind(now)
    .bind(row_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the row binding `(config_id, version)` under a profile.
/// Returns whether a row was deleted.
pub async fn delete_binding(
    pool: &PgPool,
    profile_id: &str,
    config_id: &str,
    version: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM profiles WHERE profile_id = $1 AND config_id = $2 AND version = $3",
    )
    .bind(profile_id)
    .bind(config_id)
    .bind(version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Hard-delete all rows of a profile. Returns the number of rows removed.
pub async fn delete_all(pool: &PgPool, profile_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM profiles WHERE profile_id = $1")
        .bind(profile_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    profile_id: String,
    config_id: Option<String>,
    version: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Row {
    fn into_record(self) -> ProfileRow {
        ProfileRow {
            id: self.id,
            profile_id: self.profile_id,
            config_id: self.config_id,
            version: self.version,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
