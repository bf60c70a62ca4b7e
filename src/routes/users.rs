/// User Routes
///
/// Registration, login and the current user's profile.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::SessionManager;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::UserData;
use crate::response::ApiResponse;
use crate::store::{finish, Store};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /user/register
///
/// # Errors
/// - 400: empty name or password, malformed email
/// - 409: email already used
/// - 500: storage or hashing failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn Store>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = sessions
        .register(uow.as_mut(), &form.name, &form.email, &form.password)
        .await;
    let user = finish(uow, result).await?;

    tracing::info!(user_id = %user.id, "User registered successfully");

    Ok(HttpResponse::Created().json(ApiResponse::ok(UserData::from(&user))))
}

/// POST /user/login
///
/// Returns a fresh access/refresh token pair.
///
/// # Errors
/// - 400: empty or malformed input
/// - 401: unknown email or wrong password (indistinguishable)
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn Store>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = sessions.login(uow.as_mut(), &form.email, &form.password).await;
    let tokens = finish(uow, result).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

/// GET /user/me
///
/// Requires an identity attached by the authentication gate.
pub async fn me(
    user: AuthenticatedUser,
    store: web::Data<dyn Store>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let mut uow = store.begin().await?;
    let result = sessions.current_user(uow.as_mut(), user.user_id).await;
    let profile = finish(uow, result).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(UserData::from(&profile))))
}
