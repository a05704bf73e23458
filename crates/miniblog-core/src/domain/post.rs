use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Post entity - a blog entry.
///
/// `author_id` is nullable at the storage level; handlers always set it to the
/// creating user and never reassign it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub date_posted: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post authored by `author_id`, posted now.
    pub fn new(author_id: Uuid, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id: Some(author_id),
            title,
            content,
            date_posted: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == Some(user_id)
    }

    /// Only the author may change or remove a post.
    pub fn ensure_author(&self, user_id: Uuid) -> Result<(), DomainError> {
        if self.is_authored_by(user_id) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "Only the author can modify this post".to_string(),
            ))
        }
    }

    /// Replace title and content. `date_posted` is left untouched.
    pub fn revise(&mut self, editor: Uuid, title: String, content: String) {
        self.author_id = Some(editor);
        self.title = title;
        self.content = content;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_is_authored_by_creator() {
        let author = Uuid::new_v4();
        let post = Post::new(author, "Hello".into(), "World".into());

        assert!(post.is_authored_by(author));
        assert!(!post.is_authored_by(Uuid::new_v4()));
        assert_eq!(post.date_posted, post.updated_at);
    }

    #[test]
    fn test_ensure_author_rejects_other_users() {
        let post = Post::new(Uuid::new_v4(), "Hello".into(), "World".into());
        let result = post.ensure_author(Uuid::new_v4());
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn test_post_without_author_cannot_be_modified() {
        let mut post = Post::new(Uuid::new_v4(), "Hello".into(), "World".into());
        post.author_id = None;
        assert!(post.ensure_author(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_revise_keeps_date_posted() {
        let author = Uuid::new_v4();
        let mut post = Post::new(author, "Hello".into(), "World".into());
        let posted = post.date_posted;

        post.revise(author, "Hello again".into(), "Updated".into());

        assert_eq!(post.title, "Hello again");
        assert_eq!(post.content, "Updated");
        assert_eq!(post.date_posted, posted);
        assert!(post.updated_at >= posted);
        assert!(post.is_authored_by(author));
    }
}
