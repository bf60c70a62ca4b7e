/// Password Hashing and Verification
///
/// One-way salted bcrypt hashing for user credentials.

use bcrypt::{hash, verify};
use lazy_static::lazy_static;

use crate::error::{AppError, CryptoError};

/// bcrypt work factor, fixed for every stored credential
pub const PASSWORD_HASH_COST: u32 = 12;

lazy_static! {
    // Same cost as real credentials, so checking against it takes as long
    static ref DUMMY_PASSWORD_HASH: Option<String> =
        hash("postboard-dummy-password", PASSWORD_HASH_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `CryptoError::Hashing` if bcrypt fails internally
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, PASSWORD_HASH_COST)
        .map_err(|e| AppError::Crypto(CryptoError::Hashing(e.to_string())))
}

/// Verify a candidate password against a stored hash
///
/// A mismatch is `Ok(false)`, not an error.
///
/// # Errors
/// Returns `CryptoError::Hashing` if the stored hash is malformed
pub fn verify_password(password_hash: &str, candidate: &str) -> Result<bool, AppError> {
    verify(candidate, password_hash)
        .map_err(|e| AppError::Crypto(CryptoError::Hashing(e.to_string())))
}

/// Compute the dummy hash now instead of on the first unknown-email login
pub fn prepare_dummy_password_hash() {
    lazy_static::initialize(&DUMMY_PASSWORD_HASH);
}

/// Run a full-cost verification and discard the result.
///
/// Used when there is no stored hash to check against, so that the caller
/// spends the same time as it would on a real mismatch.
pub fn verify_dummy_password(candidate: &str) {
    match DUMMY_PASSWORD_HASH.as_ref() {
        Some(dummy) => {
            let _ = verify(candidate, dummy);
        }
        None => tracing::error!("Dummy password hash unavailable"),
    }
}
