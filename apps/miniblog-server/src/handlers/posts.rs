//! Post handlers: listings, detail and author-only changes.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use miniblog_core::DomainError;
use miniblog_core::domain::Post;
use miniblog_core::pagination::PageNumber;
use miniblog_core::ports::{BaseRepository, CommentRepository, PostRepository, UserRepository};
use miniblog_core::query::{CommentQuery, PostQuery};
use miniblog_shared::ApiResponse;
use miniblog_shared::dto::{PageQuery, PostDetailResponse};
use miniblog_shared::forms::PostForm;

use super::views::{comment_response, load_authors, post_page, post_response};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn find_post(state: &AppState, id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id).into())
}

/// GET /api/posts
pub async fn list(state: web::Data<AppState>, query: web::Query<PageQuery>) -> AppResult<HttpResponse> {
    let page = PageNumber::from_query(query.page.as_deref())?;
    let posts = post_page(&state, &PostQuery::default(), page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// GET /api/users/{username}/posts
pub async fn list_by_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let page = PageNumber::from_query(query.page.as_deref())?;
    let posts = post_page(&state, &PostQuery::by_author(author.id), page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// GET /api/posts/{id}
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;

    let comment_query = CommentQuery::for_post(post.id);
    let total = state.comments.count(&comment_query).await?;
    let comments = if total == 0 {
        Vec::new()
    } else {
        state.comments.list(&comment_query, 0, total).await?
    };

    let author_ids = comments
        .iter()
        .map(|comment| comment.author_id)
        .chain(std::iter::once(post.author_id));
    let authors = load_authors(&state, author_ids).await?;

    let can_edit = identity
        .0
        .as_ref()
        .is_some_and(|identity| post.is_authored_by(identity.user_id));

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostDetailResponse {
        comments: comments
            .into_iter()
            .map(|comment| comment_response(comment, &authors))
            .collect(),
        post: post_response(post, &authors),
        can_edit,
    })))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let form = body.validate()?;

    let post = state
        .posts
        .create(Post::new(identity.user_id, form.title, form.content))
        .await?;

    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");

    let authors = load_authors(&state, [post.author_id]).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post_response(post, &authors))))
}

/// PUT /api/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, path.into_inner()).await?;
    post.ensure_author(identity.user_id)?;
    let form = body.validate()?;

    post.revise(identity.user_id, form.title, form.content);
    let post = state.posts.update(post).await?;

    tracing::info!(post_id = %post.id, author = %identity.username, "Post updated");

    let authors = load_authors(&state, [post.author_id]).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(post, &authors))))
}

/// DELETE /api/posts/{id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    post.ensure_author(identity.user_id)?;

    state.posts.delete(post.id).await?;

    tracing::info!(post_id = %post.id, author = %identity.username, "Post deleted");

    Ok(HttpResponse::Ok().json(ApiResponse::message("Your post has been deleted.")))
}
