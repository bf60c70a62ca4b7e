/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed JWTs carrying the user id as subject.
/// Signature checks here never touch storage; the authentication gate layers
/// the store lookup on top.

use chrono::{DateTime, Duration, Timelike, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, ConfigError, CryptoError};

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Mint a new access token for a user
///
/// The expiry is `now + access_token_expiry`, capped at `not_after` so an
/// access token never outlives the refresh token it is issued under.
///
/// # Errors
/// - `ConfigError` if the signing secret is empty
/// - `CryptoError::Signing` if encoding fails
pub fn generate_access_token(
    user_id: Uuid,
    config: &JwtSettings,
    not_after: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), AppError> {
    if config.secret.is_empty() {
        return Err(AppError::Config(ConfigError::MissingRequired(
            "jwt.secret".to_string(),
        )));
    }

    let now = Utc::now();
    let expires_at = std::cmp::min(now + Duration::seconds(config.access_token_expiry), not_after);
    // JWT timestamps have second precision; keep the stored expiry identical
    let expires_at = expires_at.with_nanosecond(0).unwrap_or(expires_at);

    let claims = Claims::new(user_id, now, expires_at, config.issuer.clone());

    let token = encode(
        &Header::new(SIGNING_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Crypto(CryptoError::Signing(e.to_string())))?;

    Ok((token, expires_at))
}

/// Validate an access token's signature and claims
///
/// Only HS256 is accepted; tokens declaring any other algorithm are rejected
/// before the signature is checked.
///
/// # Errors
/// Returns `AuthError::InvalidToken` if the token is malformed, expired,
/// signed with another algorithm or key, or issued by someone else
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        AppError::invalid_token()
    })
}
