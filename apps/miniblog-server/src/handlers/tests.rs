use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::{DateTime, Datelike, Utc};
use serde_json::{Value, json};

use miniblog_core::ports::{PasswordService, TokenService};
use miniblog_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};
use miniblog_shared::forms::{INVALID_LOGIN, PASSWORD_MISMATCH, REQUIRED, USERNAME_TAKEN};

use super::routes;
use crate::config::AdminAccount;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

const PASSWORD: &str = "correct-horse-battery";

fn token_service() -> Arc<dyn TokenService> {
    Arc::new(JwtTokenService::new(JwtConfig {
        secret: "test-secret".to_string(),
        ..JwtConfig::default()
    }))
}

fn password_service() -> Arc<dyn PasswordService> {
    Arc::new(Argon2PasswordService::with_params(8, 1, 1).unwrap())
}

fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
}

macro_rules! test_app {
    ($state:expr) => {
        test_app!($state, RateLimitMiddleware::disabled())
    };
    ($state:expr, $limit:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .app_data(web::Data::new(token_service()))
                .app_data(web::Data::new(password_service()))
                .configure(routes($limit)),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        let json: Value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }};
}

macro_rules! register {
    ($app:expr, $username:expr) => {{
        let (status, body) = send!(
            $app,
            test::TestRequest::post()
                .uri("/api/auth/register")
                .set_json(json!({
                    "username": $username,
                    "email": format!("{}@example.com", $username),
                    "password1": PASSWORD,
                    "password2": PASSWORD,
                }))
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }};
}

macro_rules! login {
    ($app:expr, $username:expr) => {{
        let (status, body) = send!(
            $app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "username": $username, "password": PASSWORD }))
        );
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }};
}

macro_rules! create_post {
    ($app:expr, $token:expr, $title:expr) => {{
        let (status, body) = send!(
            $app,
            authed(test::TestRequest::post().uri("/api/posts"), &$token)
                .set_json(json!({ "title": $title, "content": "Some content" }))
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }};
}

fn titles(page: &Value) -> Vec<String> {
    page["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

fn assert_newest_first(page: &Value) {
    let dates: Vec<DateTime<Utc>> = page["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| serde_json::from_value(item["date_posted"].clone()).unwrap())
        .collect();
    assert!(dates.windows(2).all(|pair| pair[0] >= pair[1]), "{dates:?}");
}

#[actix_web::test]
async fn test_health_and_about() {
    let state = AppState::in_memory();
    let app = test_app!(state);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/about"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "About");
}

#[actix_web::test]
async fn test_register_logs_the_user_in() {
    let state = AppState::in_memory();
    let app = test_app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password1": PASSWORD,
            "password2": PASSWORD,
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "Your account has been created! You are now logged in."
    );
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = body["data"]["access_token"].as_str().unwrap();
    let (status, body) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/auth/me"), token)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["is_staff"], false);
}

#[actix_web::test]
async fn test_register_reports_field_errors() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    register!(app, "alice");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "someone@example.com",
            "password1": PASSWORD,
            "password2": "something-else-entirely",
        }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["username"][0], USERNAME_TAKEN);
    assert_eq!(body["errors"]["password2"][0], PASSWORD_MISMATCH);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "username": "  " }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["username", "email", "password1", "password2"] {
        assert_eq!(body["errors"][field][0], REQUIRED, "{field}");
    }
}

#[actix_web::test]
async fn test_login_messages() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    register!(app, "alice");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "alice", "password": "wrong-password" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["__all__"][0], INVALID_LOGIN);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "nobody", "password": PASSWORD }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["__all__"][0], INVALID_LOGIN);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "alice", "password": PASSWORD }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome back, alice!");
    assert_eq!(body["data"]["token_type"], "Bearer");
}

#[actix_web::test]
async fn test_logout_revokes_the_token() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let token = register!(app, "alice");

    let (status, _) = send!(app, test::TestRequest::post().uri("/api/auth/logout"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        authed(test::TestRequest::post().uri("/api/auth/logout"), &token)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have been logged out.");

    let (status, body) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/auth/me"), &token)
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["title"], "Token Revoked");

    // A fresh login still works.
    let token = login!(app, "alice");
    let (status, _) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/auth/me"), &token)
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_post_and_comment_walkthrough() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let post_id = create_post!(app, alice, "Hello");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["Hello"]);
    assert_eq!(body["data"]["items"][0]["author"]["username"], "alice");

    let (status, body) = send!(
        app,
        authed(
            test::TestRequest::post().uri(&format!("/api/posts/{post_id}/comments")),
            &bob
        )
        .set_json(json!({ "content": "Nice!" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Your comment has been added!");
    assert_eq!(body["data"]["author"]["username"], "bob");

    let (status, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri(&format!("/api/posts/{post_id}")),
            &bob
        )
    );
    assert_eq!(status, StatusCode::OK);
    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "Nice!");
    assert_eq!(comments[0]["author"]["username"], "bob");
    assert_eq!(body["data"]["can_edit"], false);

    let (_, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri(&format!("/api/posts/{post_id}")),
            &alice
        )
    );
    assert_eq!(body["data"]["can_edit"], true);

    let (_, body) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts/{post_id}"))
    );
    assert_eq!(body["data"]["can_edit"], false);
    assert_eq!(body["data"]["post"]["author"]["username"], "alice");
}

#[actix_web::test]
async fn test_comment_checks() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");
    let post_id = create_post!(app, alice, "Hello");
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{post_id}/comments"))
            .set_json(json!({ "content": "Hi" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        authed(
            test::TestRequest::post().uri(&format!("/api/posts/{missing}/comments")),
            &alice
        )
        .set_json(json!({ "content": "" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send!(
        app,
        authed(
            test::TestRequest::post().uri(&format!("/api/posts/{post_id}/comments")),
            &alice
        )
        .set_json(json!({ "content": "   " }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["content"][0], REQUIRED);
}

#[actix_web::test]
async fn test_only_the_author_can_change_a_post() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let post_id = create_post!(app, alice, "Hello");
    let uri = format!("/api/posts/{post_id}");

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .set_json(json!({ "title": "Anon", "content": "x" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authorship is checked before the form.
    let (status, _) = send!(
        app,
        authed(test::TestRequest::put().uri(&uri), &bob).set_json(json!({ "title": "" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(app, authed(test::TestRequest::delete().uri(&uri), &bob));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        authed(test::TestRequest::put().uri(&uri), &alice).set_json(json!({ "title": "" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["title"][0], REQUIRED);

    let (_, before) = send!(app, test::TestRequest::get().uri(&uri));
    let (status, body) = send!(
        app,
        authed(test::TestRequest::put().uri(&uri), &alice)
            .set_json(json!({ "title": "Hello again", "content": "Edited" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Hello again");
    assert_eq!(body["data"]["author"]["username"], "alice");
    assert_eq!(body["data"]["date_posted"], before["data"]["post"]["date_posted"]);

    let missing = format!("/api/posts/{}", uuid::Uuid::new_v4());
    let (status, _) = send!(
        app,
        authed(test::TestRequest::put().uri(&missing), &alice)
            .set_json(json!({ "title": "t", "content": "c" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_removes_post_and_comments() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");
    let post_id = create_post!(app, alice, "Hello");
    let uri = format!("/api/posts/{post_id}");

    let (status, _) = send!(
        app,
        authed(test::TestRequest::post().uri(&format!("{uri}/comments")), &alice)
            .set_json(json!({ "content": "First" }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send!(app, authed(test::TestRequest::delete().uri(&uri), &alice));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Your post has been deleted.");

    let (status, _) = send!(app, test::TestRequest::get().uri(&uri));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 0);
}

#[actix_web::test]
async fn test_post_pagination() {
    let state = AppState::in_memory();
    let app = test_app!(state);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_pages"], 1);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts?page=2"));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let alice = register!(app, "alice");
    for n in 1..=6 {
        create_post!(app, alice, format!("Post {n}"));
    }

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["total_items"], 6);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["has_next"], true);
    assert_newest_first(&body);
    let first_page = titles(&body);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/posts?page=last"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["number"], 2);
    assert_eq!(body["data"]["has_previous"], true);
    let last_page = titles(&body);
    assert_eq!(last_page.len(), 1);
    assert!(!first_page.contains(&last_page[0]));

    for bad in ["3", "0", "-1", "abc"] {
        let (status, _) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/posts?page={bad}"))
        );
        assert_eq!(status, StatusCode::NOT_FOUND, "page={bad}");
    }
}

#[actix_web::test]
async fn test_user_post_list() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    create_post!(app, alice, "Alice one");
    create_post!(app, bob, "Bob one");
    create_post!(app, alice, "Alice two");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/users/alice/posts"));
    assert_eq!(status, StatusCode::OK);
    let mut alice_titles = titles(&body);
    alice_titles.sort();
    assert_eq!(alice_titles, ["Alice one", "Alice two"]);
    assert_newest_first(&body);

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/users/nobody/posts"));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_post_validation() {
    let state = AppState::in_memory();
    let app = test_app!(state);
    let alice = register!(app, "alice");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/posts")
            .set_json(json!({ "title": "t", "content": "c" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        authed(test::TestRequest::post().uri("/api/posts"), &alice)
            .set_json(json!({ "title": "x".repeat(201), "content": "c" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["title"][0],
        "Ensure this value has at most 200 characters (it has 201)."
    );

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts/not-a-uuid"));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_lists() {
    let state = AppState::in_memory();
    let passwords = password_service();
    state
        .ensure_admin(
            &AdminAccount {
                username: "staff".to_string(),
                email: "staff@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
            passwords.as_ref(),
        )
        .await
        .unwrap();

    let app = test_app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let staff = login!(app, "staff");

    let rust_post = create_post!(app, alice, "Learning Rust");
    create_post!(app, bob, "Gardening notes");
    let (status, _) = send!(
        app,
        authed(
            test::TestRequest::post().uri(&format!("/api/posts/{rust_post}/comments")),
            &bob
        )
        .set_json(json!({ "content": "Borrow checker tips please" }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/admin/posts"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/admin/posts"), &alice)
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/admin/posts"), &staff)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 2);
    assert_eq!(body["data"]["per_page"], 100);
    assert_newest_first(&body);

    let (_, body) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/admin/posts?q=rust"), &staff)
    );
    assert_eq!(titles(&body), ["Learning Rust"]);
    assert_eq!(body["data"]["items"][0]["author"], "alice");

    let (_, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri("/api/admin/posts?date_posted=today"),
            &staff
        )
    );
    assert_eq!(body["data"]["total_items"], 2);

    let (status, _) = send!(
        app,
        authed(test::TestRequest::get().uri("/api/admin/posts?month=1"), &staff)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri("/api/admin/comments?q=learning"),
            &staff
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["items"][0]["post"], "Learning Rust");
    assert_eq!(body["data"]["items"][0]["author"], "bob");

    let (_, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri("/api/admin/comments?q=gardening"),
            &staff
        )
    );
    assert_eq!(body["data"]["total_items"], 0);
}

#[actix_web::test]
async fn test_admin_drill_down_rejects_impossible_dates() {
    let state = AppState::in_memory();
    state
        .ensure_admin(
            &AdminAccount {
                username: "staff".to_string(),
                email: "staff@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
            password_service().as_ref(),
        )
        .await
        .unwrap();

    let app = test_app!(state);
    let staff = login!(app, "staff");

    let max = chrono::NaiveDate::MAX;
    let rejected = [
        "/api/admin/posts?year=2023&month=2&day=30".to_string(),
        "/api/admin/posts?year=2024&month=13".to_string(),
        format!("/api/admin/posts?year={}", max.year()),
        format!("/api/admin/comments?year={}&month={}", max.year(), max.month()),
        format!(
            "/api/admin/comments?year={}&month={}&day={}",
            max.year(),
            max.month(),
            max.day()
        ),
    ];
    for uri in &rejected {
        let (status, body) = send!(app, authed(test::TestRequest::get().uri(uri), &staff));
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(body["status"], 400);
    }

    let (status, body) = send!(
        app,
        authed(
            test::TestRequest::get().uri("/api/admin/posts?year=2024&month=2&day=29"),
            &staff
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 0);
}

#[cfg(feature = "rate-limit")]
#[actix_web::test]
async fn test_auth_routes_are_rate_limited() {
    use miniblog_infra::{InMemoryRateLimiter, RateLimitConfig};

    let limiter = InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: 2,
        window: std::time::Duration::from_secs(60),
    })
    .unwrap();
    let state = AppState::in_memory();
    let app = test_app!(state, RateLimitMiddleware::new(Arc::new(limiter)));

    for _ in 0..2 {
        let (status, _) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "username": "nobody", "password": "x" }))
        );
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "nobody", "password": "x" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));

    // A spoofed forwarding header does not buy a fresh quota.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(("X-Forwarded-For", "203.0.113.7"))
            .insert_header(("Forwarded", "for=203.0.113.8"))
            .set_json(json!({ "username": "nobody", "password": "x" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Another peer still has its own quota.
    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr("198.51.100.9:40000".parse().unwrap())
            .set_json(json!({ "username": "nobody", "password": "x" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Other scopes are not throttled.
    let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts"));
    assert_eq!(status, StatusCode::OK);
}
