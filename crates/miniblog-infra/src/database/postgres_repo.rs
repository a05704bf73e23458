//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select,
};
use uuid::Uuid;

use miniblog_core::domain::{Comment, Post, User};
use miniblog_core::error::RepoError;
use miniblog_core::ports::{CommentRepository, PostRepository, UserRepository};
use miniblog_core::query::{CommentQuery, DateRange, PostQuery, SortOrder};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// `ILIKE` pattern matching `term` anywhere, with wildcards in the term escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Case-insensitive "term occurs in any of `columns`".
fn any_column_contains(columns: Vec<Expr>, term: &str) -> Condition {
    let pattern = contains_pattern(term);
    columns
        .into_iter()
        .fold(Condition::any(), |cond, column| {
            let expr: SimpleExpr = column.ilike(pattern.clone());
            cond.add(expr)
        })
}

fn filter_posted<E, C>(mut select: Select<E>, column: C, range: &DateRange) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    if let Some(from) = range.from {
        select = select.filter(column.gte(from));
    }
    if let Some(until) = range.until {
        select = select.filter(column.lt(until));
    }
    select
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username = %username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

fn post_select(query: &PostQuery) -> Select<PostEntity> {
    let mut select = filter_posted(PostEntity::find(), post::Column::DatePosted, &query.posted);

    if let Some(author_id) = query.author_id {
        select = select.filter(post::Column::AuthorId.eq(author_id));
    }

    for term in &query.search {
        select = select.filter(any_column_contains(
            vec![
                Expr::col((PostEntity, post::Column::Title)),
                Expr::col((PostEntity, post::Column::Content)),
            ],
            term,
        ));
    }

    select
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count(&self, query: &PostQuery) -> Result<u64, RepoError> {
        post_select(query).count(&self.db).await.map_err(map_db_err)
    }

    async fn list(
        &self,
        query: &PostQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let select = match query.order {
            SortOrder::NewestFirst => post_select(query)
                .order_by_desc(post::Column::DatePosted)
                .order_by_desc(post::Column::Id),
            SortOrder::OldestFirst => post_select(query)
                .order_by_asc(post::Column::DatePosted)
                .order_by_asc(post::Column::Id),
        };

        let result = select
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = PostEntity::find()
            .filter(post::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

fn comment_select(query: &CommentQuery) -> Select<CommentEntity> {
    let mut select = filter_posted(
        CommentEntity::find(),
        comment::Column::DatePosted,
        &query.posted,
    );

    if let Some(post_id) = query.post_id {
        select = select.filter(comment::Column::PostId.eq(post_id));
    }
    if let Some(author_id) = query.author_id {
        select = select.filter(comment::Column::AuthorId.eq(author_id));
    }

    if !query.search.is_empty() {
        select = select.join(JoinType::InnerJoin, comment::Relation::Post.def());
        for term in &query.search {
            select = select.filter(any_column_contains(
                vec![
                    Expr::col((PostEntity, post::Column::Title)),
                    Expr::col((CommentEntity, comment::Column::Content)),
                ],
                term,
            ));
        }
    }

    select
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let active_model: comment::ActiveModel = comment.into();
        let model = active_model.insert(&self.db).await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn count(&self, query: &CommentQuery) -> Result<u64, RepoError> {
        comment_select(query)
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn list(
        &self,
        query: &CommentQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>, RepoError> {
        let select = match query.order {
            SortOrder::NewestFirst => comment_select(query)
                .order_by_desc(comment::Column::DatePosted)
                .order_by_desc(comment::Column::Id),
            SortOrder::OldestFirst => comment_select(query)
                .order_by_asc(comment::Column::DatePosted)
                .order_by_asc(comment::Column::Id),
        };

        let result = select
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}
