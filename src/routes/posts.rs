/// Post Routes
///
/// Reads are public. Writes need a logged-in caller but any logged-in caller
/// may edit or delete any post.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::posts::PostService;
use crate::response::ApiResponse;
use crate::store::{finish, Store};

#[derive(Deserialize)]
pub struct PostIdQuery {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// GET /posts
pub async fn list_posts(
    store: web::Data<dyn Store>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = posts.list(uow.as_mut()).await;
    let all = finish(uow, result).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(all)))
}

/// GET /post?id=
pub async fn get_post(
    query: web::Query<PostIdQuery>,
    store: web::Data<dyn Store>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = posts.get(uow.as_mut(), query.id).await;
    let post = finish(uow, result).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// POST /post
pub async fn create_post(
    user: AuthenticatedUser,
    form: web::Json<NewPost>,
    store: web::Data<dyn Store>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = posts
        .create(uow.as_mut(), user.user_id, &form.title, &form.content)
        .await;
    let post = finish(uow, result).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// PUT /post
pub async fn update_post(
    user: AuthenticatedUser,
    form: web::Json<UpdatePost>,
    store: web::Data<dyn Store>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = posts
        .update(uow.as_mut(), form.id, &form.title, &form.content)
        .await;
    let post = finish(uow, result).await?;

    tracing::info!(user_id = %user.user_id, post_id = %post.id, "Post updated");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// DELETE /post?id=
pub async fn delete_post(
    user: AuthenticatedUser,
    query: web::Query<PostIdQuery>,
    store: web::Data<dyn Store>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = posts.delete(uow.as_mut(), query.id).await;
    finish(uow, result).await?;

    tracing::info!(user_id = %user.user_id, post_id = %query.id, "Delete request handled");
    Ok(HttpResponse::Ok().json(ApiResponse::message("post deleted")))
}
