//! # Administrative Roles
//!
//! The three administrative roles and their mapping onto directory-service
//! roles and scopes. The directory service (the external identity provider)
//! has its own role objects; each local [`UserRole`] expands to a bundle of
//! directory role names assigned to the user's profile at onboarding.
//!
//! ## Scoping rules
//!
//! | Role       | customer_id            | org_id                 |
//! |------------|------------------------|------------------------|
//! | `sysadmin` | `*` (wildcard)         | `*` (wildcard)         |
//! | `custadmin`| required               | `*` (wildcard)         |
//! | `orgadmin` | required               | required               |
//!
//! The wildcard marker is stored in the database but hidden from API output.

use serde::{Deserialize, Serialize};

/// Scope value meaning "all customers" or "all organizations".
pub const WILDCARD_SCOPE: &str = "*";

/// Directory scope names registered at application setup.
pub const DIRECTORY_SCOPES: [&str; 4] = [
    "verifier.sysadmin",
    "verifier.custadmin",
    "verifier.orgadmin",
    "meter.reporter",
];

/// Directory role names registered at application setup, index-aligned
/// with [`DIRECTORY_SCOPES`].
pub const DIRECTORY_ROLES: [&str; 4] = [
    "verifier-sysadmin",
    "verifier-custadmin",
    "verifier-orgadmin",
    "meter-reporter",
];

/// Administrative role of a verifier-admin user, ordered by privilege.
///
/// The `Ord` derivation respects variant declaration order:
/// `Orgadmin < Custadmin < Sysadmin`. This enables `>=` comparison for
/// role-based access checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Manages verifiers within a single organization.
    Orgadmin,
    /// Manages organizations and users within a single customer.
    Custadmin,
    /// Full access across all customers.
    Sysadmin,
}

impl UserRole {
    /// Return the string stored in the database for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orgadmin => "orgadmin",
            Self::Custadmin => "custadmin",
            Self::Sysadmin => "sysadmin",
        }
    }

    /// Directory role names assigned to a user holding this role.
    pub fn directory_role_names(&self) -> &'static [&'static str] {
        match self {
            Self::Sysadmin => &[
                "verifier-sysadmin",
                "verifier-custadmin",
                "verifier-orgadmin",
                "meter-reporter",
            ],
            Self::Custadmin => &["verifier-custadmin", "verifier-orgadmin", "meter-reporter"],
            Self::Orgadmin => &["verifier-orgadmin"],
        }
    }

    /// Whether users with this role must be bound to a customer.
    pub fn requires_customer(&self) -> bool {
        !matches!(self, Self::Sysadmin)
    }

    /// Whether users with this role must be bound to an organization.
    pub fn requires_org(&self) -> bool {
        matches!(self, Self::Orgadmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orgadmin" => Ok(Self::Orgadmin),
            "custadmin" => Ok(Self::Custadmin),
            "sysadmin" => Ok(Self::Sysadmin),
            other => Err(crate::ValidationError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_is_correct() {
        assert!(UserRole::Orgadmin < UserRole::Custadmin);
        assert!(UserRole::Custadmin < UserRole::Sysadmin);
    }

    #[test]
    fn role_roundtrip() {
        for role in [UserRole::Orgadmin, UserRole::Custadmin, UserRole::Sysadmin] {
            let parsed: UserRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn invalid_role_rejected() {
        assert!("superadmin".parse::<UserRole>().is_err());
        assert!("Sysadmin".parse::<UserRole>().is_err());
    }

    #[test]
    fn sysadmin_gets_all_verifier_roles() {
        let names = UserRole::Sysadmin.directory_role_names();
        assert!(names.contains(&"verifier-sysadmin"));
        assert!(names.contains(&"verifier-custadmin"));
        assert!(names.contains(&"verifier-orgadmin"));
        assert!(names.contains(&"meter-reporter"));
    }

    #[test]
    fn orgadmin_gets_only_org_role() {
        assert_eq!(
            UserRole::Orgadmin.directory_role_names(),
            &["verifier-orgadmin"]
        );
    }

    #[test]
    fn scoping_requirements() {
        assert!(!UserRole::Sysadmin.requires_customer());
        assert!(UserRole::Custadmin.requires_customer());
        assert!(!UserRole::Custadmin.requires_org());
        assert!(UserRole::Orgadmin.requires_customer());
        assert!(UserRole::Orgadmin.requires_org());
    }

    #[test]
    fn scopes_and_roles_are_aligned() {
        assert_eq!(DIRECTORY_SCOPES.len(), DIRECTORY_ROLES.len());
    }
}
