//! In-process store
//!
//! Each unit of work reads from a snapshot taken at `begin` and stages its
//! writes. `commit` replays the staged writes against the current shared
//! tables under the lock, re-checking uniqueness, and publishes them all or
//! none. Rollback, or dropping the unit of work, discards them.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::models::{AccessToken, Post, RefreshToken, User};

use super::{Store, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    access_tokens: Vec<AccessToken>,
    posts: Vec<Post>,
}

#[derive(Debug, Clone)]
enum Write {
    InsertUser(User),
    InsertRefreshToken(RefreshToken),
    InsertAccessToken(AccessToken),
    InsertPost(Post),
    UpdatePost {
        id: Uuid,
        title: String,
        content: String,
        at: DateTime<Utc>,
    },
    DeletePost {
        id: Uuid,
        at: DateTime<Utc>,
    },
}

impl Tables {
    fn active_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| !u.is_deleted() && u.email.eq_ignore_ascii_case(email))
    }

    fn live_post_mut(&mut self, id: Uuid) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id && !p.is_deleted())
    }

    fn apply(&mut self, write: &Write) -> Result<(), AppError> {
        match write {
            Write::InsertUser(user) => {
                if self.active_user_by_email(&user.email).is_some() {
                    return Err(AppError::Conflict("email already used".to_string()));
                }
                self.users.push(user.clone());
            }
            Write::InsertRefreshToken(token) => {
                if self.refresh_tokens.iter().any(|t| t.token_hash == token.token_hash) {
                    return Err(unique_violation("refresh_tokens_token_hash_key"));
                }
                self.refresh_tokens.push(token.clone());
            }
            Write::InsertAccessToken(token) => {
                if !self.refresh_tokens.iter().any(|t| t.id == token.refresh_token_id) {
                    return Err(AppError::Database(DatabaseError::QueryExecution(
                        "access_tokens.refresh_token_id references a missing refresh token"
                            .to_string(),
                    )));
                }
                if self.access_tokens.iter().any(|t| t.token_hash == token.token_hash) {
                    return Err(unique_violation("access_tokens_token_hash_key"));
                }
                self.access_tokens.push(token.clone());
            }
            Write::InsertPost(post) => self.posts.push(post.clone()),
            Write::UpdatePost { id, title, content, at } => {
                if let Some(post) = self.live_post_mut(*id) {
                    post.title = title.clone();
                    post.content = content.clone();
                    post.updated_at = Some(*at);
                }
            }
            Write::DeletePost { id, at } => {
                if let Some(post) = self.live_post_mut(*id) {
                    post.deleted_at = Some(*at);
                }
            }
        }
        Ok(())
    }
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(constraint.to_string()))
}

/// Shared in-memory tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed (refresh, access) token rows
    #[cfg(test)]
    pub(crate) fn token_counts(&self) -> (usize, usize) {
        let tables = self.tables.lock().unwrap();
        (tables.refresh_tokens.len(), tables.access_tokens.len())
    }
}

fn lock(tables: &Mutex<Tables>) -> Result<MutexGuard<'_, Tables>, AppError> {
    tables
        .lock()
        .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let view = lock(&self.tables)?.clone();
        Ok(Box::new(MemoryUnitOfWork {
            shared: Arc::clone(&self.tables),
            view,
            pending: Vec::new(),
        }))
    }
}

pub struct MemoryUnitOfWork {
    shared: Arc<Mutex<Tables>>,
    view: Tables,
    pending: Vec<Write>,
}

impl MemoryUnitOfWork {
    fn stage(&mut self, write: Write) -> Result<(), AppError> {
        self.view.apply(&write)?;
        self.pending.push(write);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_active_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.view.active_user_by_email(email).cloned())
    }

    async fn find_active_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .view
            .users
            .iter()
            .find(|u| u.id == id && !u.is_deleted())
            .cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), AppError> {
        self.stage(Write::InsertUser(user.clone()))
    }

    async fn insert_refresh_token(&mut self, token: &RefreshToken) -> Result<(), AppError> {
        self.stage(Write::InsertRefreshToken(token.clone()))
    }

    async fn find_active_refresh_token(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        Ok(self
            .view
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.is_active_at(now))
            .cloned())
    }

    async fn insert_access_token(&mut self, token: &AccessToken) -> Result<(), AppError> {
        self.stage(Write::InsertAccessToken(token.clone()))
    }

    async fn active_access_token_exists(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self
            .view
            .access_tokens
            .iter()
            .any(|t| t.token_hash == token_hash && t.is_active_at(now)))
    }

    async fn insert_post(&mut self, post: &Post) -> Result<(), AppError> {
        self.stage(Write::InsertPost(post.clone()))
    }

    async fn update_post(
        &mut self,
        id: Uuid,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, AppError> {
        if self.view.live_post_mut(id).is_none() {
            return Ok(None);
        }
        self.stage(Write::UpdatePost {
            id,
            title: title.to_string(),
            content: content.to_string(),
            at: now,
        })?;
        Ok(self.view.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn soft_delete_post(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        if self.view.live_post_mut(id).is_none() {
            return Ok(false);
        }
        self.stage(Write::DeletePost { id, at: now })?;
        Ok(true)
    }

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self
            .view
            .posts
            .iter()
            .find(|p| p.id == id && !p.is_deleted())
            .cloned())
    }

    async fn list_posts(&mut self) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self
            .view
            .posts
            .iter()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        posts.sort_by_key(|p| p.created_at);
        Ok(posts)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut shared = lock(&self.shared)?;
        let mut next = shared.clone();
        for write in &self.pending {
            next.apply(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&user("a@example.com")).await.unwrap();
        uow.commit().await.unwrap();

        let mut reader = store.begin().await.unwrap();
        assert!(reader
            .find_active_user_by_email("a@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&user("a@example.com")).await.unwrap();
        // Visible inside its own unit of work
        assert!(uow.find_active_user_by_email("a@example.com").await.unwrap().is_some());
        uow.rollback().await.unwrap();

        let mut dropped = store.begin().await.unwrap();
        dropped.insert_user(&user("b@example.com")).await.unwrap();
        drop(dropped);

        let mut reader = store.begin().await.unwrap();
        assert!(reader.find_active_user_by_email("a@example.com").await.unwrap().is_none());
        assert!(reader.find_active_user_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_email_conflicts_on_commit() {
        let store = MemoryStore::new();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_user(&user("a@example.com")).await.unwrap();
        second.insert_user(&user("a@example.com")).await.unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_access_token_requires_refresh_token() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let orphan = AccessToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_id: Uuid::new_v4(),
            token_hash: "h".to_string(),
            created_at: Utc::now(),
            expired_at: Utc::now() + Duration::hours(1),
            revoked_at: None,
        };

        assert!(uow.insert_access_token(&orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_soft_deleted_posts_are_hidden() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        uow.insert_post(&post).await.unwrap();

        assert!(uow.soft_delete_post(post.id, Utc::now()).await.unwrap());
        assert!(!uow.soft_delete_post(post.id, Utc::now()).await.unwrap());
        assert!(uow.find_post(post.id).await.unwrap().is_none());
        assert!(uow.list_posts().await.unwrap().is_empty());
        assert!(uow
            .update_post(post.id, "x", "y", Utc::now())
            .await
            .unwrap()
            .is_none());
    }
}
