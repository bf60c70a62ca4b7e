/// Refresh Token Generation and Token Hashing
///
/// Refresh tokens are opaque: 32 bytes from the operating system RNG,
/// hex-encoded. Their only meaning is as a lookup key, via their SHA-256
/// hash, into the token store. The same hash is used for access tokens.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{AppError, CryptoError};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new refresh token
///
/// # Errors
/// Returns `CryptoError::Randomness` if the OS random source fails
pub fn generate_refresh_token() -> Result<String, AppError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Crypto(CryptoError::Randomness(e.to_string())))?;

    Ok(to_hex(&bytes))
}

/// SHA-256 of a raw token, lowercase hex. Only this value is ever stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
