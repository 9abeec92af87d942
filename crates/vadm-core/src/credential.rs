//! # Credential Constants
//!
//! Shared vocabulary for verifier credentials issued through the external
//! credential service.

use serde::{Deserialize, Serialize};

/// The credential `type` value placed in every issued verifier credential.
pub const VERIFIER_CREDENTIAL_TYPE: &str = "VerifierCredential";

/// Request header carrying the issuer id on credential-service calls.
pub const ISSUER_ID_HEADER: &str = "x-hpass-issuer-id";

/// Request header carrying the transaction id for request correlation.
pub const TXN_ID_HEADER: &str = "x-hpass-txn-id";

/// Output format for a verifier's stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialFormat {
    /// Raw credential document as JSON.
    Json,
    /// Credential rendered as a QR code PNG.
    Qr,
}

impl Default for CredentialFormat {
    fn default() -> Self {
        Self::Qr
    }
}

impl std::str::FromStr for CredentialFormat {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "qr" => Ok(Self::Qr),
            other => Err(crate::ValidationError::UnknownCredentialFormat(
                other.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses() {
        assert_eq!("json".parse::<CredentialFormat>().unwrap(), CredentialFormat::Json);
        assert_eq!("qr".parse::<CredentialFormat>().unwrap(), CredentialFormat::Qr);
        assert!("png".parse::<CredentialFormat>().is_err());
    }

    #[test]
    fn default_format_is_qr() {
        assert_eq!(CredentialFormat::default(), CredentialFormat::Qr);
    }
}
