/// Authentication gate
///
/// Runs on every request. A request without an `Authorization` header passes
/// through anonymously; a request with one must carry a bearer token whose
/// signature verifies and whose hash is recorded as active in the token store.
/// On success the caller's identity is attached to the request extensions.
/// Whether a route needs an identity is decided separately (`RequireLogin`).

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{is_access_token_active, validate_access_token};
use crate::configuration::JwtSettings;
use crate::error::AppError;
use crate::store::Store;

/// Identity resolved from a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Pull the token out of `Bearer <token>`
fn bearer_token(header: &str) -> Result<&str, AppError> {
    let (scheme, token) = header.split_once(' ').ok_or_else(AppError::unauthorized)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return Err(AppError::unauthorized());
    }
    Ok(token)
}

/// Resolve the identity behind an `Authorization` header value.
///
/// - no header: `Ok(None)`
/// - not `Bearer <token>`: `AuthError::Unauthorized`
/// - bad signature, or not active in the store: `AuthError::InvalidToken`
///
/// Opens a unit of work for the lookup and always rolls it back; nothing is
/// written.
pub async fn authenticate(
    header: Option<&str>,
    store: &dyn Store,
    jwt: &JwtSettings,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let header = match header {
        Some(header) => header,
        None => return Ok(None),
    };

    let token = bearer_token(header)?;
    let claims = validate_access_token(token, jwt)?;
    let user_id = claims.user_id()?;

    let mut uow = store.begin().await?;
    let active = is_access_token_active(uow.as_mut(), token).await;
    if let Err(e) = uow.rollback().await {
        tracing::warn!(error = %e, "Failed to release read-only unit of work");
    }

    if !active? {
        tracing::warn!(user_id = %user_id, "Access token not active in store");
        return Err(AppError::invalid_token());
    }

    Ok(Some(AuthenticatedUser { user_id }))
}

/// Optional-authentication middleware wrapping the whole app
pub struct AuthGate {
    store: Arc<dyn Store>,
    jwt: JwtSettings,
}

impl AuthGate {
    pub fn new(store: Arc<dyn Store>, jwt: JwtSettings) -> Self {
        Self { store, jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGateService {
            service: Rc::new(service),
            store: Arc::clone(&self.store),
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    store: Arc<dyn Store>,
    jwt: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let store = Arc::clone(&self.store);
        let jwt = self.jwt.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .map(|value| value.to_str().map(str::to_owned))
                .transpose();

            // Rejections become responses here so outer middleware still
            // sees the request
            let header = match header {
                Ok(header) => header,
                Err(_) => {
                    let res = req.error_response(AppError::unauthorized());
                    return Ok(res.map_into_right_body());
                }
            };

            match authenticate(header.as_deref(), &*store, &jwt).await {
                Ok(Some(user)) => {
                    tracing::debug!(user_id = %user.user_id, "Request authenticated");
                    req.extensions_mut().insert(user);
                }
                Ok(None) => {}
                Err(err) => return Ok(req.error_response(err).map_into_right_body()),
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
