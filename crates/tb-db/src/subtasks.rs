//! Subtask repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{SubTask, UpdateSubTaskDto};

use crate::repository::{RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait SubTaskStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<SubTask>>;

    /// Ordered by position
    async fn list_by_task(&self, task_id: Id) -> RepositoryResult<Vec<SubTask>>;

    /// Appended after the last subtask of the task
    async fn create(&self, task_id: Id, title: &str) -> RepositoryResult<SubTask>;

    async fn update(&self, id: Id, dto: UpdateSubTaskDto) -> RepositoryResult<SubTask>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL subtask repository
#[derive(Clone)]
pub struct SubTaskRepository {
    pool: PgPool,
}

impl SubTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubTaskStore for SubTaskRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<SubTask>> {
        let subtask = sqlx::query_as::<_, SubTask>("SELECT * FROM subtasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(subtask)
    }

    async fn list_by_task(&self, task_id: Id) -> RepositoryResult<Vec<SubTask>> {
        let subtasks = sqlx::query_as::<_, SubTask>(
            "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY position, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subtasks)
    }

    async fn create(&self, task_id: Id, title: &str) -> RepositoryResult<SubTask> {
        let subtask = sqlx::query_as::<_, SubTask>(
            r#"
            INSERT INTO subtasks (task_id, title, position, created_at, updated_at)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM subtasks WHERE task_id = $1),
                NOW(), NOW()
            )
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(title.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(subtask)
    }

    async fn update(&self, id: Id, dto: UpdateSubTaskDto) -> RepositoryResult<SubTask> {
        let subtask = sqlx::query_as::<_, SubTask>(
            r#"
            UPDATE subtasks SET
                title = COALESCE($1, title),
                is_completed = COALESCE($2, is_completed),
                position = COALESCE($3, position),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(dto.title.as_deref().map(str::trim))
        .bind(dto.is_completed)
        .bind(dto.position)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("SubTask", id))?;

        Ok(subtask)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("SubTask", id));
        }

        Ok(())
    }
}
