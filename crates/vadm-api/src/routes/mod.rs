//! # Route Modules
//!
//! One module per resource. Each exposes `router()` returning a
//! `Router<AppState>` that [`crate::app`] merges under the auth middleware.

pub mod customers;
pub mod organizations;
pub mod profiles;
pub mod users;
pub mod verifiers;
