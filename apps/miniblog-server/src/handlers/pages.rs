//! Static pages.

use actix_web::HttpResponse;
use miniblog_shared::ApiResponse;
use miniblog_shared::dto::AboutResponse;

/// GET /api/about
pub async fn about() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(AboutResponse {
        title: "About".to_string(),
        description: "Miniblog is a small blog: write posts, read what others wrote \
                      and join the conversation in the comments."
            .to_string(),
    }))
}
