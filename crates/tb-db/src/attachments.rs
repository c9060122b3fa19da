//! Attachment metadata repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{Attachment, NewAttachment};

use crate::repository::{RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Attachment>>;

    async fn list_by_task(&self, task_id: Id) -> RepositoryResult<Vec<Attachment>>;

    async fn create(&self, new: NewAttachment) -> RepositoryResult<Attachment>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL attachment repository
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentStore for AttachmentRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Attachment>> {
        let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(attachment)
    }

    async fn list_by_task(&self, task_id: Id) -> RepositoryResult<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE task_id = $1 ORDER BY created_at, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    async fn create(&self, new: NewAttachment) -> RepositoryResult<Attachment> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (
                task_id, uploader_id, filename, storage_key, content_type, file_size, digest,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING *
            "#,
        )
        .bind(new.task_id)
        .bind(new.uploader_id)
        .bind(&new.filename)
        .bind(&new.storage_key)
        .bind(&new.content_type)
        .bind(new.file_size)
        .bind(&new.digest)
        .fetch_one(&self.pool)
        .await?;

        Ok(attachment)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Attachment", id));
        }

        Ok(())
    }
}
