//! # Lifecycle Statuses
//!
//! Typed status enums for soft-deletable records. Customers and organizations
//! share [`EntityStatus`] (active/inactive); verifiers carry the richer
//! [`VerifierStatus`] because revocation may be left half-finished when the
//! external credential service misbehaves (the `pending` state).
//!
//! Statuses are persisted as lowercase strings. [`std::str::FromStr`] is the
//! read path from the database; unknown values are an error, never a silent
//! default.

use serde::{Deserialize, Serialize};

/// Status of a soft-deletable record (customer or organization).
///
/// Inactive records are excluded from list endpoints and from uniqueness
/// checks, but remain addressable by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// Record is live.
    Active,
    /// Record has been soft-deleted.
    Inactive,
}

impl EntityStatus {
    /// Return the string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityStatus {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(crate::ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Status of a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierStatus {
    /// Verifier holds a live credential.
    Active,
    /// Credential has been revoked.
    Revoked,
    /// Revocation was requested but the credential service did not confirm.
    /// Reconciled later against the service's revoke status.
    Pending,
}

impl VerifierStatus {
    /// Return the string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for VerifierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VerifierStatus {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            "pending" => Ok(Self::Pending),
            other => Err(crate::ValidationError::UnknownStatus(other.to_string())),
        }
    }
}
