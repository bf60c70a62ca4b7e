use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{AuthGate, RequireLogin};
use crate::posts::PostService;
use crate::routes::{
    create_post, delete_post, get_post, health_check, list_posts, login, me, refresh, register,
    update_post,
};
use crate::store::Store;

/// Malformed bodies and query strings get the JSON envelope, not actix's
/// plain-text default
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::Malformed(err.to_string())).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::Malformed(err.to_string())).into()
    })
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn Store>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let jwt_config = settings.jwt.clone();
    let store_data: web::Data<dyn Store> = web::Data::from(Arc::clone(&store));
    let sessions = web::Data::new(SessionManager::new(settings.jwt.clone()));
    let posts = web::Data::new(PostService::new(settings.posts.require_fields));

    let server = HttpServer::new(move || {
        App::new()
            // Authentication is optional here; routes opt in below
            .wrap(AuthGate::new(Arc::clone(&store), jwt_config.clone()))
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())

            // Shared state
            .app_data(store_data.clone())
            .app_data(sessions.clone())
            .app_data(posts.clone())
            .app_data(json_config())
            .app_data(query_config())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/user/register", web::post().to(register))
            .route("/user/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/posts", web::get().to(list_posts))

            // Protected routes
            .service(
                web::resource("/user/me")
                    .wrap(RequireLogin)
                    .route(web::get().to(me)),
            )
            // Writes take an `AuthenticatedUser` argument, which rejects anonymous callers
            .service(
                web::resource("/post")
                    .route(web::get().to(get_post))
                    .route(web::post().to(create_post))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
