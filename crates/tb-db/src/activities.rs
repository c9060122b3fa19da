//! Activity log repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{ActivityLog, NewActivity};

use crate::repository::{Pagination, PaginatedResult, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert(&self, activity: NewActivity) -> RepositoryResult<()>;

    async fn list_by_workspace(
        &self,
        workspace_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>>;

    async fn list_by_task(
        &self,
        task_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>>;

    async fn list_by_user(
        &self,
        user_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>>;
}

/// Column the feed is filtered by; never user input
#[derive(Debug, Clone, Copy)]
enum Feed {
    Workspace,
    Task,
    User,
}

impl Feed {
    fn column(self) -> &'static str {
        match self {
            Feed::Workspace => "a.workspace_id",
            Feed::Task => "a.task_id",
            Feed::User => "a.user_id",
        }
    }
}

/// PostgreSQL activity repository
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(
        &self,
        feed: Feed,
        id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>> {
        let sql = format!(
            r#"
            SELECT a.*, u.name AS user_name
            FROM activity_logs a
            LEFT JOIN users u ON u.id = a.user_id
            WHERE {} = $1
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $2 OFFSET $3
            "#,
            feed.column()
        );
        let items = sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(id)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM activity_logs a WHERE {} = $1",
            feed.column()
        );
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn insert(&self, activity: NewActivity) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (
                user_id, workspace_id, task_id, action, entity_type, entity_id, details,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(activity.user_id)
        .bind(activity.workspace_id)
        .bind(activity.task_id)
        .bind(activity.action)
        .bind(activity.entity_type)
        .bind(activity.entity_id)
        .bind(&activity.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_workspace(
        &self,
        workspace_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>> {
        self.list(Feed::Workspace, workspace_id, pagination).await
    }

    async fn list_by_task(
        &self,
        task_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>> {
        self.list(Feed::Task, task_id, pagination).await
    }

    async fn list_by_user(
        &self,
        user_id: Id,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<ActivityLog>> {
        self.list(Feed::User, user_id, pagination).await
    }
}
