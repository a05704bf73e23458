//! In-memory repositories - used when no database is configured, and in tests.
//!
//! All three repositories share one [`MemoryStore`], which enforces the same
//! constraints as the PostgreSQL schema: unique usernames, comments must
//! reference an existing post, and deletes cascade from users to their posts
//! and comments and from posts to their comments.
//! Note: Data is lost on process restart.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use miniblog_core::domain::{Comment, Post, User};
use miniblog_core::error::RepoError;
use miniblog_core::ports::{BaseRepository, CommentRepository, PostRepository, UserRepository};
use miniblog_core::query::{CommentQuery, PostQuery, SortOrder};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn delete_post_cascade(&mut self, post_id: Uuid) -> bool {
        let removed = self.posts.remove(&post_id).is_some();
        if removed {
            self.comments.retain(|_, c| c.post_id != post_id);
        }
        removed
    }
}

/// Shared in-memory tables backing the in-memory repositories.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: self.clone(),
        }
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository {
            store: self.clone(),
        }
    }
}

fn by_date(order: SortOrder, a: (DateTime<Utc>, Uuid), b: (DateTime<Utc>, Uuid)) -> Ordering {
    match order {
        SortOrder::NewestFirst => b.cmp(&a),
        SortOrder::OldestFirst => a.cmp(&b),
    }
}

fn window<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect()
}

/// In-memory user repository.
pub struct InMemoryUserRepository {
    store: MemoryStore,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.users.contains_key(&user.id)
            || tables.users.values().any(|u| u.username == user.username)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }

        let authored: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == Some(id))
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.delete_post_cascade(post_id);
        }
        tables.comments.retain(|_, c| c.author_id != Some(id));

        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }
}

/// In-memory post repository.
pub struct InMemoryPostRepository {
    store: MemoryStore,
}

impl InMemoryPostRepository {
    async fn matching(&self, query: &PostQuery) -> Vec<Post> {
        let tables = self.store.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| by_date(query.order, (a.date_posted, a.id), (b.date_posted, b.id)));
        posts
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.get(&id).cloned())
    }

    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.posts.contains_key(&post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        if post
            .author_id
            .is_some_and(|id| !tables.users.contains_key(&id))
        {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        match tables.posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(post)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.delete_post_cascade(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, query: &PostQuery) -> Result<u64, RepoError> {
        Ok(self.matching(query).await.len() as u64)
    }

    async fn list(
        &self,
        query: &PostQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        Ok(window(self.matching(query).await, offset, limit))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.posts.get(id).cloned())
            .collect())
    }
}

/// In-memory comment repository.
pub struct InMemoryCommentRepository {
    store: MemoryStore,
}

impl InMemoryCommentRepository {
    async fn matching(&self, query: &CommentQuery) -> Vec<Comment> {
        let tables = self.store.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| {
                let title = tables
                    .posts
                    .get(&c.post_id)
                    .map(|p| p.title.as_str())
                    .unwrap_or_default();
                query.matches(c, title)
            })
            .cloned()
            .collect();
        comments.sort_by(|a, b| by_date(query.order, (a.date_posted, a.id), (b.date_posted, b.id)));
        comments
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;

        if !tables.posts.contains_key(&comment.post_id)
            || comment
                .author_id
                .is_some_and(|id| !tables.users.contains_key(&id))
        {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }

        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn count(&self, query: &CommentQuery) -> Result<u64, RepoError> {
        Ok(self.matching(query).await.len() as u64)
    }

    async fn list(
        &self,
        query: &CommentQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>, RepoError> {
        Ok(window(self.matching(query).await, offset, limit))
    }
}
