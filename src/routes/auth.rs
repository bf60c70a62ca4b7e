/// Token refresh route

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::SessionManager;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::store::{finish, Store};

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// POST /auth/refresh
///
/// Issues a new access token under an existing refresh token. The refresh
/// token itself is returned unchanged.
///
/// # Errors
/// - 401: unknown, expired or revoked refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    store: web::Data<dyn Store>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = sessions.refresh(uow.as_mut(), &form.refresh_token).await;
    let tokens = finish(uow, result).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}
