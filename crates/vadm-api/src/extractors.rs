//! Request-body extraction and validation.
//!
//! Admin payloads arrive as camelCase JSON and fail in one of two layers:
//! a body that does not deserialize at all is a 400 (`BAD_REQUEST`), while
//! a well-formed body that breaks a business rule — blank customer name,
//! malformed email, unknown role — is a 422 (`VALIDATION_ERROR`). Handlers
//! take `Result<Json<T>, JsonRejection>` and run it through
//! [`extract_validated_json`] before touching the database or an external
//! service.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business rules for a request DTO, checked after serde has accepted the
/// shape of the body.
pub trait Validate {
    /// Returns a human-readable rule violation, if any.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction and apply the DTO's business rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = result.map_err(|err| AppError::BadRequest(err.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Reject blank or whitespace-only required fields with a uniform message.
/// `field` is the camelCase name as it appears in the payload.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct RenameRequest {
        name: String,
    }

    impl Validate for RenameRequest {
        fn validate(&self) -> Result<(), String> {
            require_non_blank("name", &self.name)
        }
    }

    #[test]
    fn valid_body_passes_through() {
        let body = Ok(Json(RenameRequest {
            name: "Acme".into(),
        }));
        let value = extract_validated_json(body).unwrap();
        assert_eq!(value.name, "Acme");
    }

    #[test]
    fn rule_violation_maps_to_validation_error() {
        let body = Ok(Json(RenameRequest { name: "  ".into() }));
        let err = extract_validated_json(body).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn non_blank_names_the_offending_field() {
        let err = require_non_blank("verifierType", " ").unwrap_err();
        assert!(err.contains("verifierType"));
        assert!(require_non_blank("name", "ok").is_ok());
    }
}
