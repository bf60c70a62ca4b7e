/// Blog posts
///
/// Create, update, soft-delete, get and list. Authorship is recorded on
/// create but not checked on update or delete.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::Post;
use crate::store::UnitOfWork;

#[derive(Clone, Debug)]
pub struct PostService {
    require_fields: bool,
}

impl PostService {
    /// `require_fields` turns on the non-blank check for title and content
    pub fn new(require_fields: bool) -> Self {
        Self { require_fields }
    }

    fn check_fields(&self, title: &str, content: &str) -> Result<(), ValidationError> {
        if !self.require_fields {
            return Ok(());
        }
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title".to_string()));
        }
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyField("content".to_string()));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        uow: &mut dyn UnitOfWork,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, AppError> {
        self.check_fields(title, content)?;

        let post = Post {
            id: Uuid::new_v4(),
            user_id: author_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };

        uow.insert_post(&post).await?;
        tracing::info!(post_id = %post.id, user_id = %author_id, "Post created");

        Ok(post)
    }

    /// # Errors
    /// `NotFound` if the post does not exist or was deleted
    pub async fn update(
        &self,
        uow: &mut dyn UnitOfWork,
        id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, AppError> {
        self.check_fields(title, content)?;

        let post = uow
            .update_post(id, title, content, Utc::now())
            .await?
            .ok_or_else(post_not_found)?;

        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    /// Soft-delete a post. Deleting a missing post is not an error.
    pub async fn delete(&self, uow: &mut dyn UnitOfWork, id: Uuid) -> Result<(), AppError> {
        if uow.soft_delete_post(id, Utc::now()).await? {
            tracing::info!(post_id = %id, "Post deleted");
        } else {
            tracing::debug!(post_id = %id, "Delete of missing post ignored");
        }
        Ok(())
    }

    pub async fn get(&self, uow: &mut dyn UnitOfWork, id: Uuid) -> Result<Post, AppError> {
        uow.find_post(id).await?.ok_or_else(post_not_found)
    }

    pub async fn list(&self, uow: &mut dyn UnitOfWork) -> Result<Vec<Post>, AppError> {
        uow.list_posts().await
    }
}

fn post_not_found() -> AppError {
    AppError::NotFound("post not found".to_string())
}
