//! Category repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{Category, CreateCategoryDto, UpdateCategoryDto};

use crate::repository::{RepositoryError, RepositoryResult};

pub const NAME_TAKEN: &str = "Name has already been taken";

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Category>>;

    async fn list_by_workspace(&self, workspace_id: Id) -> RepositoryResult<Vec<Category>>;

    /// Case-insensitive name check within one workspace
    async fn is_name_unique(
        &self,
        workspace_id: Id,
        name: &str,
        exclude_id: Option<Id>,
    ) -> RepositoryResult<bool>;

    /// Fails with a conflict when the name is taken
    async fn create(&self, dto: CreateCategoryDto) -> RepositoryResult<Category>;

    async fn update(&self, id: Id, dto: UpdateCategoryDto) -> RepositoryResult<Category>;

    /// Tasks in the category become uncategorized
    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL category repository
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for CategoryRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn list_by_workspace(&self, workspace_id: Id) -> RepositoryResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE workspace_id = $1 ORDER BY LOWER(name), id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn is_name_unique(
        &self,
        workspace_id: Id,
        name: &str,
        exclude_id: Option<Id>,
    ) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE workspace_id = $1
                  AND LOWER(name) = LOWER($2)
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(workspace_id)
        .bind(name.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }

    async fn create(&self, dto: CreateCategoryDto) -> RepositoryResult<Category> {
        if !self.is_name_unique(dto.workspace_id, &dto.name, None).await? {
            return Err(RepositoryError::Conflict(NAME_TAKEN.to_string()));
        }

        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (workspace_id, name, color, created_by_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(dto.workspace_id)
        .bind(dto.name.trim())
        .bind(&dto.color)
        .bind(dto.created_by_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, NAME_TAKEN))
    }

    async fn update(&self, id: Id, dto: UpdateCategoryDto) -> RepositoryResult<Category> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Category", id))?;

        if let Some(name) = &dto.name {
            if !self.is_name_unique(existing.workspace_id, name, Some(id)).await? {
                return Err(RepositoryError::Conflict(NAME_TAKEN.to_string()));
            }
        }

        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($1, name),
                color = COALESCE($2, color),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(dto.name.as_deref().map(str::trim))
        .bind(&dto.color)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, NAME_TAKEN))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Category", id));
        }

        Ok(())
    }
}
