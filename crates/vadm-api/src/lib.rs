//! # vadm-api — Verifier Administration HTTP Service
//!
//! Axum service for administering the tenant hierarchy behind credentialed
//! verifiers: customers own organizations, organizations own verifiers,
//! and verifiers hold verifiable credentials issued through an external
//! credential service. Administrative users live in a cloud-directory
//! identity provider; this service orchestrates their onboarding.
//!
//! ## API Surface
//!
//! | Prefix                               | Module                       |
//! |--------------------------------------|------------------------------|
//! | `/customers/*`                       | [`routes::customers`]        |
//! | `/customers/:id/orgs/*`              | [`routes::organizations`]    |
//! | `/customers/:id/orgs/:id/verifiers/*`| [`routes::verifiers`]        |
//! | `/users/*`                           | [`routes::users`]            |
//! | `/profiles/*`                        | [`routes::profiles`]         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! Health probes (`/health/*`) are mounted outside the auth middleware.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Handler result alias used across the route modules.
pub type AppResult<T> = Result<T, AppError>;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::customers::router())
        .merge(routes::organizations::router())
        .merge(routes::verifiers::router())
        .merge(routes::users::router())
        .merge(routes::profiles::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
