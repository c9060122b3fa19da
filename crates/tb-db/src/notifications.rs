//! Notification repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{NewNotification, Notification};

use crate::repository::{Pagination, PaginatedResult, RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> RepositoryResult<Notification>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Notification>>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<Notification>>;

    async fn unread_count(&self, user_id: Id) -> RepositoryResult<i64>;

    /// Keeps the first `read_at` when already read
    async fn mark_read(&self, id: Id) -> RepositoryResult<Notification>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, user_id: Id) -> RepositoryResult<u64>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL notification repository
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, new: NewNotification) -> RepositoryResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                user_id, actor_id, kind, title, message, workspace_id, task_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.actor_id)
        .bind(new.kind)
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.workspace_id)
        .bind(new.task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Notification>> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: Id,
        unread_only: bool,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<Notification>> {
        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT is_read)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn unread_count(&self, user_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, id: Id) -> RepositoryResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Notification", id))?;

        Ok(notification)
    }

    async fn mark_all_read(&self, user_id: Id) -> RepositoryResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE, read_at = NOW()
            WHERE user_id = $1 AND NOT is_read
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Notification", id));
        }

        Ok(())
    }
}
