//! Comment submission.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use miniblog_core::DomainError;
use miniblog_core::domain::Comment;
use miniblog_core::ports::{BaseRepository, CommentRepository};
use miniblog_shared::ApiResponse;
use miniblog_shared::forms::CommentForm;

use super::views::{comment_response, load_authors};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{id}/comments
pub async fn add(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?;

    let content = body.validate()?;
    let comment = state
        .comments
        .create(Comment::new(post.id, identity.user_id, content))
        .await?;

    tracing::info!(
        comment_id = %comment.id,
        post_id = %post.id,
        author = %identity.username,
        "Comment added"
    );

    let authors = load_authors(&state, [comment.author_id]).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        comment_response(comment, &authors),
        "Your comment has been added!",
    )))
}
