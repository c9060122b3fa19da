//! Task repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{CreateTaskDto, DueTaskReminder, Task, UpdateTaskDto};
use tb_queries::TaskQuery;

use crate::query_executor::{TaskQueryExecutor, TaskScope};
use crate::repository::{PaginatedResult, RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Task>>;

    async fn query(
        &self,
        query: TaskQuery,
        scope: TaskScope,
    ) -> RepositoryResult<PaginatedResult<Task>>;

    async fn create(&self, dto: CreateTaskDto) -> RepositoryResult<Task>;

    async fn update(&self, id: Id, dto: UpdateTaskDto) -> RepositoryResult<Task>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;

    async fn count_by_workspace(&self, workspace_id: Id) -> RepositoryResult<i64>;

    /// Open, assigned, not yet reminded tasks due in `[from, until]`
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> RepositoryResult<Vec<DueTaskReminder>>;

    async fn mark_reminded(&self, id: Id, at: DateTime<Utc>) -> RepositoryResult<()>;
}

/// PostgreSQL task repository
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn query(
        &self,
        query: TaskQuery,
        scope: TaskScope,
    ) -> RepositoryResult<PaginatedResult<Task>> {
        TaskQueryExecutor::new(&self.pool)
            .execute(&query, &scope)
            .await
    }

    async fn create(&self, dto: CreateTaskDto) -> RepositoryResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                workspace_id, title, description, status, priority, start_date, due_date,
                completed_at, category_id, creator_id, assignee_id, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                CASE WHEN $4 = 'completed' THEN NOW() END,
                $8, $9, $10, NOW(), NOW()
            )
            RETURNING *
            "#,
        )
        .bind(dto.workspace_id)
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.status)
        .bind(dto.priority)
        .bind(dto.start_date)
        .bind(dto.due_date)
        .bind(dto.category_id)
        .bind(dto.creator_id)
        .bind(dto.assignee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: Id, dto: UpdateTaskDto) -> RepositoryResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = COALESCE($1, title),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                start_date = CASE WHEN $6 THEN $7 ELSE start_date END,
                due_date = CASE WHEN $8 THEN $9 ELSE due_date END,
                completed_at = CASE WHEN $10 THEN $11 ELSE completed_at END,
                category_id = CASE WHEN $12 THEN $13 ELSE category_id END,
                assignee_id = CASE WHEN $14 THEN $15 ELSE assignee_id END,
                reminder_sent_at = CASE WHEN $16 THEN NULL ELSE reminder_sent_at END,
                updated_at = NOW()
            WHERE id = $17
            RETURNING *
            "#,
        )
        .bind(&dto.title)
        .bind(dto.description.is_some())
        .bind(dto.description.clone().flatten())
        .bind(dto.status)
        .bind(dto.priority)
        .bind(dto.start_date.is_some())
        .bind(dto.start_date.flatten())
        .bind(dto.due_date.is_some())
        .bind(dto.due_date.flatten())
        .bind(dto.completed_at.is_some())
        .bind(dto.completed_at.flatten())
        .bind(dto.category_id.is_some())
        .bind(dto.category_id.flatten())
        .bind(dto.assignee_id.is_some())
        .bind(dto.assignee_id.flatten())
        .bind(dto.reset_reminder)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Task", id))?;

        Ok(task)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Task", id));
        }

        Ok(())
    }

    async fn count_by_workspace(&self, workspace_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE workspace_id = $1")
            .bind(workspace_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> RepositoryResult<Vec<DueTaskReminder>> {
        let reminders = sqlx::query_as::<_, DueTaskReminder>(
            r#"
            SELECT t.id AS task_id, t.title, t.due_date,
                   w.id AS workspace_id, w.name AS workspace_name,
                   u.id AS assignee_id, u.name AS assignee_name, u.email AS assignee_email,
                   u.email_notifications
            FROM tasks t
            JOIN workspaces w ON w.id = t.workspace_id
            JOIN users u ON u.id = t.assignee_id
            WHERE t.status <> 'completed'
              AND t.reminder_sent_at IS NULL
              AND t.due_date >= $1
              AND t.due_date <= $2
            ORDER BY t.due_date, t.id
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    async fn mark_reminded(&self, id: Id, at: DateTime<Utc>) -> RepositoryResult<()> {
        sqlx::query("UPDATE tasks SET reminder_sent_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
