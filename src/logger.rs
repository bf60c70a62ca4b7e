use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;

use crate::error::{AppError, ErrorContext, ErrorHandler};
use crate::middleware::AuthenticatedUser;

/// Header carrying the id every log line of the request is tagged with
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
/// Gives every request one id, opens a tracing span carrying it, logs
/// method, path, status and latency, and logs a failed request's `AppError`
/// exactly once. The id is returned to the client in `x-request-id`.
/// Headers are not logged, so bearer tokens never reach the logs.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let context = ErrorContext::new(format!("{} {}", method, path));

        let span = tracing::info_span!("request", request_id = %context.request_id);
        span.in_scope(|| tracing::debug!(method = %method, path = %path, "Request started"));

        let service = self.service.clone();

        Box::pin(
            async move {
                let result = service.call(req).await;

                let mut res = match result {
                    Ok(res) => res,
                    Err(err) => {
                        // Inner middleware answers with responses; anything
                        // left here is converted by actix itself
                        match err.as_error::<AppError>() {
                            Some(app_err) => app_err.log_error(&context),
                            None => tracing::error!(
                                request_id = %context.request_id,
                                error = %err,
                                "Request failed"
                            ),
                        }
                        return Err(err);
                    }
                };

                if let Some(err) = res.response().error() {
                    let user_id = res
                        .request()
                        .extensions()
                        .get::<AuthenticatedUser>()
                        .map(|user| user.user_id);
                    let context = match user_id {
                        Some(user_id) => context.clone().with_user_id(user_id),
                        None => context.clone(),
                    };

                    match err.as_error::<AppError>() {
                        Some(app_err) => app_err.log_error(&context),
                        None => tracing::warn!(
                            request_id = %context.request_id,
                            error = %err,
                            "Request rejected"
                        ),
                    }
                }

                if let Ok(value) = HeaderValue::from_str(&context.request_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }

                tracing::info!(
                    method = %method,
                    path = %path,
                    status = res.status().as_u16(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Request completed"
                );

                Ok(res)
            }
            .instrument(span),
        )
    }
}
