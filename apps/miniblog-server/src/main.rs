//! # Miniblog API Server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use miniblog_core::ports::{PasswordService, TokenService};
use miniblog_infra::{Argon2PasswordService, JwtTokenService};

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitMiddleware;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!("Starting Miniblog API Server on {}:{}", config.host, config.port);

    let state = AppState::new(config.database.as_ref())
        .await
        .context("failed to initialize application state")?;

    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

    if let Some(admin) = &config.admin {
        state
            .ensure_admin(admin, password_service.as_ref())
            .await
            .context("failed to create the admin account")?;
    }

    let auth_limit = auth_rate_limit(&config)?;

    let state = web::Data::new(state);
    let token_service = web::Data::new(token_service);
    let password_service = web::Data::new(password_service);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .app_data(token_service.clone())
            .app_data(password_service.clone())
            .configure(handlers::routes(auth_limit.clone()))
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(feature = "rate-limit")]
fn auth_rate_limit(config: &AppConfig) -> anyhow::Result<RateLimitMiddleware> {
    use miniblog_infra::{InMemoryRateLimiter, RateLimitConfig};

    let limiter = InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: config.rate_limit.max_requests,
        window: config.rate_limit.window,
    })?;

    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "Auth rate limiting enabled"
    );
    Ok(RateLimitMiddleware::new(Arc::new(limiter)))
}

#[cfg(not(feature = "rate-limit"))]
fn auth_rate_limit(_config: &AppConfig) -> anyhow::Result<RateLimitMiddleware> {
    tracing::info!("Built without the rate-limit feature - auth routes are not throttled");
    Ok(RateLimitMiddleware::disabled())
}
