/// Login requirement
///
/// Rejects requests that reached the handler without an identity attached by
/// the authentication gate. Usable as middleware on a resource or scope, or
/// as an `AuthenticatedUser` handler argument.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use super::auth_gate::AuthenticatedUser;
use crate::error::AppError;

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or_else(AppError::unauthorized),
        )
    }
}

pub struct RequireLogin;

impl<S, B> Transform<S, ServiceRequest> for RequireLogin
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireLoginService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireLoginService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireLoginService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireLoginService<S>
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
        if req.extensions().get::<AuthenticatedUser>().is_none() {
            tracing::debug!(path = %req.path(), "Login required");
            let res = req.error_response(AppError::unauthorized());
            return Box::pin(async move { Ok(res.map_into_right_body()) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, web, App, HttpResponse};
    use uuid::Uuid;

    async fn protected(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    async fn open() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_extractor_rejects_anonymous() {
        let app = actix_test::init_service(App::new().route("/p", web::get().to(protected))).await;

        let req = actix_test::TestRequest::get().uri("/p").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_extractor_yields_attached_identity() {
        let user_id = Uuid::new_v4();
        let app = actix_test::init_service(
            App::new()
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(AuthenticatedUser { user_id });
                    srv.call(req)
                })
                .route("/p", web::get().to(protected)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/p").to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, user_id.to_string());
    }

    #[actix_web::test]
    async fn test_middleware_rejects_anonymous() {
        let app = actix_test::init_service(
            App::new().service(web::resource("/o").wrap(RequireLogin).route(web::get().to(open))),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/o").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
