//! Storage layer
//!
//! A `Store` hands out units of work. Each request that touches storage opens
//! one, performs all of its reads and writes through it, and then either
//! commits or rolls back. Dropping a unit of work without committing discards
//! its writes, so a cancelled request leaves storage in its pre-request state.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AccessToken, Post, RefreshToken, User};

/// Source of units of work
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;
}

/// One request's atomic scope of storage access.
///
/// Lookups filter out soft-deleted users and posts. Token lookups take hashes,
/// never raw token values.
#[async_trait]
pub trait UnitOfWork: Send {
    // =========================================================================
    // Users
    // =========================================================================

    /// Find a non-deleted user by normalized email
    async fn find_active_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_active_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Insert a user. Fails with `Conflict` if the email is already in use.
    async fn insert_user(&mut self, user: &User) -> Result<(), AppError>;

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_refresh_token(&mut self, token: &RefreshToken) -> Result<(), AppError>;

    /// Refresh token with this hash that is unrevoked and expires after `now`
    async fn find_active_refresh_token(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError>;

    async fn insert_access_token(&mut self, token: &AccessToken) -> Result<(), AppError>;

    /// Whether an unrevoked access token with this hash expires after `now`
    async fn active_access_token_exists(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    // =========================================================================
    // Posts
    // =========================================================================

    async fn insert_post(&mut self, post: &Post) -> Result<(), AppError>;

    /// Update title and content of a non-deleted post, returning the new row
    async fn update_post(
        &mut self,
        id: Uuid,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, AppError>;

    /// Soft-delete a post. Returns whether a live post was deleted.
    async fn soft_delete_post(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError>;

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>, AppError>;

    /// All non-deleted posts, oldest first
    async fn list_posts(&mut self) -> Result<Vec<Post>, AppError>;

    // =========================================================================
    // Completion
    // =========================================================================

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Commit on success, roll back on failure, and hand back the outcome.
///
/// A rollback failure is logged; the original error is what the caller sees.
pub async fn finish<T>(uow: Box<dyn UnitOfWork>, result: Result<T, AppError>) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            tracing::debug!("unit of work committed");
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                tracing::error!(error = %rollback_error, "rollback failed");
            } else {
                tracing::debug!(error = %error, "unit of work rolled back");
            }
            Err(error)
        }
    }
}
