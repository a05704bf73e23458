//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod comments;
mod health;
mod pages;
mod posts;
mod views;

#[cfg(test)]
mod tests;

use actix_web::web;

use crate::middleware::error::AppError;
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Route configuration; `auth_limit` guards the `/api/auth` scope.
pub fn routes(auth_limit: RateLimitMiddleware) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| configure_routes(cfg, auth_limit)
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth_limit: RateLimitMiddleware) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::NotFound(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .route("/about", web::get().to(pages::about))
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    .route("/{id}", web::get().to(posts::detail))
                    .route("/{id}", web::put().to(posts::update))
                    .route("/{id}", web::delete().to(posts::delete))
                    .route("/{id}/comments", web::post().to(comments::add)),
            )
            .route("/users/{username}/posts", web::get().to(posts::list_by_user))
            // Auth routes
            .service(
                web::scope("/auth")
                    .wrap(auth_limit)
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/logout", web::post().to(auth::logout))
                    .route("/me", web::get().to(auth::me)),
            )
            // Staff routes
            .service(
                web::scope("/admin")
                    .route("/posts", web::get().to(admin::posts))
                    .route("/comments", web::get().to(admin::comments)),
            ),
    );
}
