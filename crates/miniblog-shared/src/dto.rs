//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `?page=` query parameter of the paginated listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Public reference to a post or comment author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub date_posted: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    pub date_posted: DateTime<Utc>,
    pub author: Option<AuthorSummary>,
}

/// A post with its comments (oldest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
    /// True when the caller is the post's author and may edit or delete it.
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutResponse {
    pub title: String,
    pub description: String,
}

/// Row of the admin post list: title, author, date posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPostRow {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub date_posted: DateTime<Utc>,
}

/// Row of the admin comment list: post, author, date posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub post: String,
    pub author: Option<String>,
    pub date_posted: DateTime<Utc>,
}
