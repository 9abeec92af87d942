//! # Expiry Arithmetic
//!
//! Verifier credentials expire a whole number of days after issuance.
//! Centralizing the arithmetic keeps the issuance path, the list filter,
//! and the revocation shortcut in agreement.

use chrono::{DateTime, Duration, Utc};

/// Compute an expiration timestamp a number of days after `now`.
///
/// Saturates at `DateTime::MAX_UTC` for absurdly large day counts rather
/// than panicking.
pub fn expiration_from_days(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(days))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whether an expiration timestamp has passed.
pub fn is_expired(expiration: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiration < now
}
