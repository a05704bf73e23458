//! Domain -> response conversions shared by the handlers.

use std::collections::{HashMap, HashSet};

use miniblog_core::domain::{Comment, Post, User};
use miniblog_core::pagination::{Page, PageNumber, Paginator, POSTS_PER_PAGE};
use miniblog_core::ports::{PostRepository, UserRepository};
use miniblog_core::query::PostQuery;
use miniblog_shared::dto::{AuthorSummary, CommentResponse, PostResponse, UserResponse};
use uuid::Uuid;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Authors by id, for resolving `author_id` columns in one query.
pub(super) type Authors = HashMap<Uuid, User>;

pub(super) async fn load_authors(
    state: &AppState,
    ids: impl IntoIterator<Item = Option<Uuid>>,
) -> AppResult<Authors> {
    let ids: Vec<Uuid> = ids
        .into_iter()
        .flatten()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(Authors::new());
    }

    let users = state.users.find_by_ids(&ids).await?;
    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

fn author_summary(author_id: Option<Uuid>, authors: &Authors) -> Option<AuthorSummary> {
    let user = authors.get(&author_id?)?;
    Some(AuthorSummary {
        id: user.id,
        username: user.username.clone(),
    })
}

pub(super) fn author_name(author_id: Option<Uuid>, authors: &Authors) -> Option<String> {
    author_id
        .and_then(|id| authors.get(&id))
        .map(|user| user.username.clone())
}

pub(super) fn post_response(post: Post, authors: &Authors) -> PostResponse {
    PostResponse {
        author: author_summary(post.author_id, authors),
        id: post.id,
        title: post.title,
        content: post.content,
        date_posted: post.date_posted,
        updated_at: post.updated_at,
    }
}

pub(super) fn comment_response(comment: Comment, authors: &Authors) -> CommentResponse {
    CommentResponse {
        author: author_summary(comment.author_id, authors),
        id: comment.id,
        post_id: comment.post_id,
        content: comment.content,
        date_posted: comment.date_posted,
    }
}

pub(super) fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        is_staff: user.is_staff,
        date_joined: user.date_joined,
    }
}

/// One page (of 5) of the posts matching `query`.
pub(super) async fn post_page(
    state: &AppState,
    query: &PostQuery,
    page: PageNumber,
) -> AppResult<Page<PostResponse>> {
    let paginator = Paginator::new(state.posts.count(query).await?, POSTS_PER_PAGE);
    let window = paginator.window(page)?;
    let posts = state.posts.list(query, window.offset, window.limit).await?;

    let authors = load_authors(state, posts.iter().map(|post| post.author_id)).await?;
    let items = posts
        .into_iter()
        .map(|post| post_response(post, &authors))
        .collect();

    Ok(Page::new(items, window, &paginator))
}
