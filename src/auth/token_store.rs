/// Token Store
///
/// Records and looks up access and refresh tokens by their SHA-256 hash.
/// Raw token values enter these functions and are hashed before anything
/// reaches the unit of work.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::refresh_token::hash_token;
use crate::error::AppError;
use crate::models::{AccessToken, RefreshToken};
use crate::store::UnitOfWork;

/// Persist a refresh token, returning the stored record.
///
/// The record's `id` is what later access tokens link to.
pub async fn record_refresh_token(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
    raw_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<RefreshToken, AppError> {
    let token = RefreshToken {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(raw_token),
        created_at: Utc::now(),
        expired_at: expires_at,
        revoked_at: None,
    };

    uow.insert_refresh_token(&token).await?;
    tracing::debug!(user_id = %user_id, token_id = %token.id, "Refresh token recorded");

    Ok(token)
}

/// Persist an access token linked to the refresh token it was issued under.
pub async fn record_access_token(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
    refresh_token_id: Uuid,
    raw_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<AccessToken, AppError> {
    let token = AccessToken {
        id: Uuid::new_v4(),
        user_id,
        refresh_token_id,
        token_hash: hash_token(raw_token),
        created_at: Utc::now(),
        expired_at: expires_at,
        revoked_at: None,
    };

    uow.insert_access_token(&token).await?;
    tracing::debug!(
        user_id = %user_id,
        refresh_token_id = %refresh_token_id,
        "Access token recorded"
    );

    Ok(token)
}

/// Whether this access token was issued by us and is neither expired nor revoked.
///
/// # Errors
/// Storage failures propagate; an unknown token is `Ok(false)`.
pub async fn is_access_token_active(uow: &mut dyn UnitOfWork, raw_token: &str) -> Result<bool, AppError> {
    uow.active_access_token_exists(&hash_token(raw_token), Utc::now())
        .await
}

/// Look up an active refresh token by its raw value.
///
/// # Errors
/// `AuthError::InvalidToken` when no unrevoked, unexpired token matches.
pub async fn find_active_refresh_token_by_raw(
    uow: &mut dyn UnitOfWork,
    raw_token: &str,
) -> Result<RefreshToken, AppError> {
    uow.find_active_refresh_token(&hash_token(raw_token), Utc::now())
        .await?
        .ok_or_else(AppError::invalid_token)
}
