//! Authentication handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use miniblog_core::domain::User;
use miniblog_core::error::RepoError;
use miniblog_core::ports::{
    BaseRepository, PasswordService, TokenService, UserRepository, revoked_token_key,
};
use miniblog_shared::dto::AuthResponse;
use miniblog_shared::forms::{
    INACTIVE_ACCOUNT, INVALID_LOGIN, LoginForm, RegisterForm, USERNAME_TAKEN,
};
use miniblog_shared::{ApiResponse, FormErrors};

use super::views::user_response;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn issue_token(token_service: &dyn TokenService, user: &User) -> AppResult<AuthResponse> {
    let token = token_service.generate_token(user.id, &user.username, user.roles())?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds().max(0) as u64,
        user: user_response(user),
    })
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterForm>,
) -> AppResult<HttpResponse> {
    let form = body.into_inner();

    let taken = state
        .users
        .find_by_username(form.normalized_username())
        .await?
        .is_some();
    let registration = form.validate(taken)?;

    let password_hash = password_service.hash(&registration.password)?;
    let user = User::new(registration.username, registration.email, password_hash);

    // A concurrent registration may have claimed the name since the check.
    let user = state.users.create(user).await.map_err(|err| match err {
        RepoError::Constraint(_) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            AppError::Validation(errors)
        }
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let response = issue_token(token_service.get_ref().as_ref(), &user)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        response,
        "Your account has been created! You are now logged in.",
    )))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginForm>,
) -> AppResult<HttpResponse> {
    let credentials = body.validate()?;

    let user = match state.users.find_by_username(&credentials.username).await? {
        Some(user) if password_service.verify(&credentials.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!(username = %credentials.username, "Login rejected");
            return Err(FormErrors::non_field(INVALID_LOGIN).into());
        }
    };

    if !user.is_active {
        return Err(FormErrors::non_field(INACTIVE_ACCOUNT).into());
    }

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    let response = issue_token(token_service.get_ref().as_ref(), &user)?;
    let message = format!("Welcome back, {}!", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(response, message)))
}

/// POST /api/auth/logout
///
/// Revokes the presented token until it would have expired anyway.
pub async fn logout(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let remaining = (identity.expires_at - Utc::now().timestamp()).max(1) as u64;

    state
        .cache
        .set(
            &revoked_token_key(&identity.token_id),
            &identity.user_id.to_string(),
            Some(Duration::from_secs(remaining)),
        )
        .await?;

    tracing::info!(user_id = %identity.user_id, username = %identity.username, "User logged out");

    Ok(HttpResponse::Ok().json(ApiResponse::message("You have been logged out.")))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(&user))))
}
