//! PostgreSQL store backed by a `sqlx` pool. Every unit of work is one
//! database transaction; a dropped, uncommitted transaction is rolled back
//! by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::configuration::DatabaseSettings;
use crate::error::{AppError, DatabaseError};
use crate::models::{AccessToken, Post, RefreshToken, User};

use super::{Store, UnitOfWork};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect and apply the bundled migrations
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.connection_string())
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::UnexpectedError(e.to_string())))?;

        tracing::info!("Database migrations applied");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at, deleted_at";
const POST_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at, deleted_at";

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_active_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_active_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_refresh_token(&mut self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, created_at, expired_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expired_at)
        .bind(token.revoked_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_active_refresh_token(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, created_at, expired_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1 AND expired_at > $2 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(token)
    }

    async fn insert_access_token(&mut self, token: &AccessToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens
                (id, user_id, refresh_token_id, token_hash, created_at, expired_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.refresh_token_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expired_at)
        .bind(token.revoked_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn active_access_token_exists(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM access_tokens
                WHERE token_hash = $1 AND expired_at > $2 AND revoked_at IS NULL
            )
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_post(&mut self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, title, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_post(
        &mut self,
        id: Uuid,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts SET title = $2, content = $3, updated_at = $4
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(post)
    }

    async fn soft_delete_post(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE id = $1 AND deleted_at IS NULL",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(post)
    }

    async fn list_posts(&mut self) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE deleted_at IS NULL ORDER BY created_at",
            POST_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(posts)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
