#![deny(missing_docs)]

//! # vadm-core — Foundational Types for the Verifier Administration Stack
//!
//! This crate defines the domain vocabulary every other crate in the
//! workspace depends on. It has no internal crate dependencies — only
//! `serde`, `thiserror`, and `chrono` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Typed statuses everywhere.** Customer, organization, and verifier
//!    statuses are enums, not strings. The compiler enforces exhaustive
//!    handling; invalid values cannot be persisted.
//!
//! 2. **Single role vocabulary.** [`UserRole`] is the one definition of the
//!    administrative roles and their directory role bundles. No independent
//!    role lists that can diverge between the auth layer and onboarding.
//!
//! 3. **Structured errors with `thiserror`.** No `Box<dyn Error>`, no
//!    `.unwrap()` outside tests.

pub mod credential;
pub mod error;
pub mod roles;
pub mod status;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use credential::{CredentialFormat, ISSUER_ID_HEADER, TXN_ID_HEADER, VERIFIER_CREDENTIAL_TYPE};
pub use error::{validate_email, ValidationError};
pub use roles::{UserRole, DIRECTORY_ROLES, DIRECTORY_SCOPES, WILDCARD_SCOPE};
pub use status::{EntityStatus, VerifierStatus};
pub use temporal::{expiration_from_days, is_expired};

#[cfg(test)]
mod tests {
    #[test]
    fn root_reexports_resolve() {
        crate::validate_email("admin@example.com").unwrap();
        assert_eq!(crate::DIRECTORY_SCOPES.len(), crate::DIRECTORY_ROLES.len());
        assert_eq!(crate::WILDCARD_SCOPE, "*");
    }
}
