/// Session and token lifecycle
///
/// Registration, login, refresh and current-user lookup. Each operation takes
/// the caller's unit of work and performs all of its reads and writes through
/// it; committing or rolling back is the caller's job (see `store::finish`).

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, prepare_dummy_password_hash, verify_dummy_password, verify_password};
use crate::auth::refresh_token::generate_refresh_token;
use crate::auth::token_store::{find_active_refresh_token_by_raw, record_access_token, record_refresh_token};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::models::{TokenPair, User};
use crate::store::UnitOfWork;
use crate::validators::{is_valid_email, is_valid_name, is_valid_password};

#[derive(Clone, Debug)]
pub struct SessionManager {
    jwt: JwtSettings,
}

impl SessionManager {
    pub fn new(jwt: JwtSettings) -> Self {
        prepare_dummy_password_hash();
        Self { jwt }
    }

    pub fn jwt_settings(&self) -> &JwtSettings {
        &self.jwt
    }

    /// Create a user account
    ///
    /// # Errors
    /// - `ValidationError` for an empty name or password, or a malformed email
    /// - `Conflict` if an active user already has this email (case-insensitive)
    /// - `CryptoError::Hashing` if bcrypt fails
    pub async fn register(
        &self,
        uow: &mut dyn UnitOfWork,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let name = is_valid_name(name)?;
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        if uow.find_active_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("email already used".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };

        uow.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    /// Exchange credentials for a fresh access/refresh token pair
    ///
    /// An unknown email and a wrong password produce the same error, and
    /// both cost one bcrypt verification.
    pub async fn login(
        &self,
        uow: &mut dyn UnitOfWork,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let user = match uow.find_active_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                verify_dummy_password(password);
                tracing::debug!("Login for unknown email");
                return Err(AppError::Auth(AuthError::InvalidCredentials));
            }
        };

        if !verify_password(&user.password_hash, password)? {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let refresh_token = generate_refresh_token()?;
        let refresh_expiry = Utc::now() + Duration::seconds(self.jwt.refresh_token_expiry);
        let recorded = record_refresh_token(uow, user.id, &refresh_token, refresh_expiry).await?;

        let (access_token, access_expiry) =
            generate_access_token(user.id, &self.jwt, recorded.expired_at)?;
        record_access_token(uow, user.id, recorded.id, &access_token, access_expiry).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(TokenPair::bearer(access_token, refresh_token, access_expiry))
    }

    /// Mint a new access token under an existing refresh token
    ///
    /// The refresh token is not rotated: the same raw value comes back and
    /// stays usable until its own expiry.
    ///
    /// # Errors
    /// `AuthError::InvalidToken` if the refresh token is unknown, expired,
    /// revoked, or belongs to a deleted user
    pub async fn refresh(&self, uow: &mut dyn UnitOfWork, raw_refresh_token: &str) -> Result<TokenPair, AppError> {
        if raw_refresh_token.trim().is_empty() {
            return Err(AppError::invalid_token());
        }

        let parent = find_active_refresh_token_by_raw(uow, raw_refresh_token).await?;

        if uow.find_active_user_by_id(parent.user_id).await?.is_none() {
            tracing::warn!(user_id = %parent.user_id, "Refresh token owner no longer active");
            return Err(AppError::invalid_token());
        }

        let (access_token, access_expiry) =
            generate_access_token(parent.user_id, &self.jwt, parent.expired_at)?;
        record_access_token(uow, parent.user_id, parent.id, &access_token, access_expiry).await?;

        tracing::info!(user_id = %parent.user_id, "Access token refreshed");

        Ok(TokenPair::bearer(
            access_token,
            raw_refresh_token.to_string(),
            access_expiry,
        ))
    }

    /// Load the active user behind an authenticated identity
    pub async fn current_user(&self, uow: &mut dyn UnitOfWork, user_id: Uuid) -> Result<User, AppError> {
        uow.find_active_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }
}
