//! Staff-only post and comment lists with search, filters and date drill-down.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use miniblog_core::pagination::{ADMIN_PER_PAGE, Page, PageNumber, Paginator};
use miniblog_core::ports::{CommentRepository, PostRepository};
use miniblog_core::query::{
    CommentQuery, DateFilter, DateHierarchy, DateRange, PostQuery, SortOrder, split_search_terms,
};
use miniblog_shared::ApiResponse;
use miniblog_shared::dto::{AdminCommentRow, AdminPostRow};

use super::views::{author_name, load_authors};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string shared by both admin lists.
#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    /// Search terms; double-quoted phrases stay whole.
    pub q: Option<String>,
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub date_posted: DateFilter,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub page: Option<String>,
}

impl AdminListQuery {
    fn search_terms(&self) -> Vec<String> {
        self.q.as_deref().map(split_search_terms).unwrap_or_default()
    }

    fn posted(&self) -> AppResult<DateRange> {
        let hierarchy = DateHierarchy {
            year: self.year,
            month: self.month,
            day: self.day,
        };
        Ok(self.date_posted.range(Utc::now()).intersect(hierarchy.range()?))
    }

    fn page(&self) -> AppResult<PageNumber> {
        Ok(PageNumber::from_query(self.page.as_deref())?)
    }
}

fn require_staff(identity: &Identity) -> AppResult<()> {
    if identity.is_staff() {
        Ok(())
    } else {
        tracing::warn!(user_id = %identity.user_id, "Non-staff user denied admin access");
        Err(AppError::Forbidden("Staff access required".to_string()))
    }
}

/// GET /api/admin/posts
pub async fn posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<AdminListQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let query = PostQuery {
        author_id: params.author_id,
        search: params.search_terms(),
        posted: params.posted()?,
        order: SortOrder::NewestFirst,
    };

    let paginator = Paginator::new(state.posts.count(&query).await?, ADMIN_PER_PAGE);
    let window = paginator.window(params.page()?)?;
    let posts = state.posts.list(&query, window.offset, window.limit).await?;

    let authors = load_authors(&state, posts.iter().map(|post| post.author_id)).await?;
    let rows = posts
        .into_iter()
        .map(|post| AdminPostRow {
            author: author_name(post.author_id, &authors),
            id: post.id,
            title: post.title,
            date_posted: post.date_posted,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Page::new(rows, window, &paginator))))
}

/// GET /api/admin/comments
pub async fn comments(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<AdminListQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let query = CommentQuery {
        post_id: None,
        author_id: params.author_id,
        search: params.search_terms(),
        posted: params.posted()?,
        order: SortOrder::NewestFirst,
    };

    let paginator = Paginator::new(state.comments.count(&query).await?, ADMIN_PER_PAGE);
    let window = paginator.window(params.page()?)?;
    let comments = state.comments.list(&query, window.offset, window.limit).await?;

    let mut post_ids: Vec<Uuid> = comments.iter().map(|comment| comment.post_id).collect();
    post_ids.sort_unstable();
    post_ids.dedup();
    let titles: HashMap<Uuid, String> = state
        .posts
        .find_by_ids(&post_ids)
        .await?
        .into_iter()
        .map(|post| (post.id, post.title))
        .collect();

    let authors = load_authors(&state, comments.iter().map(|comment| comment.author_id)).await?;
    let rows = comments
        .into_iter()
        .map(|comment| AdminCommentRow {
            post: titles.get(&comment.post_id).cloned().unwrap_or_default(),
            author: author_name(comment.author_id, &authors),
            id: comment.id,
            post_id: comment.post_id,
            date_posted: comment.date_posted,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Page::new(rows, window, &paginator))))
}
