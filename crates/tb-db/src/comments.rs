//! Comment repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{Comment, CommentWithAuthor};

use crate::repository::{Pagination, PaginatedResult, RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Comment>>;

    /// Oldest first
    async fn list_by_task(
        &self,
        task_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<CommentWithAuthor>>;

    async fn create(
        &self,
        task_id: Id,
        user_id: Id,
        content: &str,
    ) -> RepositoryResult<CommentWithAuthor>;

    async fn update(&self, id: Id, content: &str) -> RepositoryResult<CommentWithAuthor>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL comment repository
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for CommentRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn list_by_task(
        &self,
        task_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<CommentWithAuthor>> {
        let items = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.*, u.name AS author_name, u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            ORDER BY c.created_at, c.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(task_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE task_id = $1")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn create(
        &self,
        task_id: Id,
        user_id: Id,
        content: &str,
    ) -> RepositoryResult<CommentWithAuthor> {
        let comment = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            WITH c AS (
                INSERT INTO comments (task_id, user_id, content, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                RETURNING *
            )
            SELECT c.*, u.name AS author_name, u.avatar_url AS author_avatar_url
            FROM c JOIN users u ON u.id = c.user_id
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(content.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn update(&self, id: Id, content: &str) -> RepositoryResult<CommentWithAuthor> {
        let comment = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            WITH c AS (
                UPDATE comments SET content = $1, updated_at = NOW()
                WHERE id = $2
                RETURNING *
            )
            SELECT c.*, u.name AS author_name, u.avatar_url AS author_avatar_url
            FROM c JOIN users u ON u.id = c.user_id
            "#,
        )
        .bind(content.trim())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Comment", id))?;

        Ok(comment)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Comment", id));
        }

        Ok(())
    }
}
