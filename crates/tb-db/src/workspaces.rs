//! Workspace repository

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tb_core::Id;
use tb_models::{CreateWorkspaceDto, UpdateWorkspaceDto, Workspace, WorkspaceWithRole};

use crate::repository::{RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Workspace>>;

    /// Workspaces where `user_id` is an active member, personal first
    async fn list_for_user(&self, user_id: Id) -> RepositoryResult<Vec<WorkspaceWithRole>>;

    async fn find_for_user(
        &self,
        id: Id,
        user_id: Id,
    ) -> RepositoryResult<Option<WorkspaceWithRole>>;

    /// Insert the workspace and the owner's active membership in one transaction
    async fn create(&self, dto: CreateWorkspaceDto) -> RepositoryResult<Workspace>;

    async fn update(&self, id: Id, dto: UpdateWorkspaceDto) -> RepositoryResult<Workspace>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;

    /// Make `new_owner_id` the owner; the previous owner stays on as admin
    async fn transfer_ownership(
        &self,
        id: Id,
        previous_owner_id: Id,
        new_owner_id: Id,
    ) -> RepositoryResult<Workspace>;

    /// Non-personal workspaces owned by `user_id` that have other members
    async fn count_shared_owned_by(&self, user_id: Id) -> RepositoryResult<i64>;
}

/// Insert a workspace plus its owner membership on an open connection
pub(crate) async fn insert_workspace(
    conn: &mut PgConnection,
    dto: &CreateWorkspaceDto,
) -> Result<Workspace, sqlx::Error> {
    let workspace = sqlx::query_as::<_, Workspace>(
        r#"
        INSERT INTO workspaces (name, description, is_personal, owner_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(&dto.name)
    .bind(&dto.description)
    .bind(dto.is_personal)
    .bind(dto.owner_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO workspace_members (
            workspace_id, user_id, role, status, joined_at, created_at, updated_at
        ) VALUES ($1, $2, 'owner', 'active', NOW(), NOW(), NOW())
        "#,
    )
    .bind(workspace.id)
    .bind(dto.owner_id)
    .execute(&mut *conn)
    .await?;

    Ok(workspace)
}

const WITH_ROLE_SELECT: &str = r#"
    SELECT w.*, m.role,
           (SELECT COUNT(*) FROM workspace_members c
             WHERE c.workspace_id = w.id AND c.status = 'active') AS member_count
    FROM workspaces w
    JOIN workspace_members m ON m.workspace_id = w.id
    WHERE m.user_id = $1 AND m.status = 'active'
"#;

/// PostgreSQL workspace repository
#[derive(Clone)]
pub struct WorkspaceRepository {
    pool: PgPool,
}

impl WorkspaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceStore for WorkspaceRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Workspace>> {
        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(workspace)
    }

    async fn list_for_user(&self, user_id: Id) -> RepositoryResult<Vec<WorkspaceWithRole>> {
        let sql = format!(
            "{} ORDER BY w.is_personal DESC, LOWER(w.name), w.id",
            WITH_ROLE_SELECT
        );
        let workspaces = sqlx::query_as::<_, WorkspaceWithRole>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(workspaces)
    }

    async fn find_for_user(
        &self,
        id: Id,
        user_id: Id,
    ) -> RepositoryResult<Option<WorkspaceWithRole>> {
        let sql = format!("{} AND w.id = $2", WITH_ROLE_SELECT);
        let workspace = sqlx::query_as::<_, WorkspaceWithRole>(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(workspace)
    }

    async fn create(&self, dto: CreateWorkspaceDto) -> RepositoryResult<Workspace> {
        let mut tx = self.pool.begin().await?;
        let workspace = insert_workspace(&mut *tx, &dto).await?;
        tx.commit().await?;

        Ok(workspace)
    }

    async fn update(&self, id: Id, dto: UpdateWorkspaceDto) -> RepositoryResult<Workspace> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET
                name = COALESCE($1, name),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.description.is_some())
        .bind(dto.description.clone().flatten())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Workspace", id))?;

        Ok(workspace)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Workspace", id));
        }

        Ok(())
    }

    async fn transfer_ownership(
        &self,
        id: Id,
        previous_owner_id: Id,
        new_owner_id: Id,
    ) -> RepositoryResult<Workspace> {
        let mut tx = self.pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(
            "UPDATE workspaces SET owner_id = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(new_owner_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Workspace", id))?;

        sqlx::query(
            r#"
            UPDATE workspace_members SET role = 'admin', updated_at = NOW()
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(previous_owner_id)
        .execute(&mut *tx)
        .await?;

        let promoted = sqlx::query(
            r#"
            UPDATE workspace_members SET role = 'owner', updated_at = NOW()
            WHERE workspace_id = $1 AND user_id = $2 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(new_owner_id)
        .execute(&mut *tx)
        .await?;

        if promoted.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "New owner is not an active member".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(workspace)
    }

    async fn count_shared_owned_by(&self, user_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM workspaces w
            WHERE w.owner_id = $1
              AND NOT w.is_personal
              AND EXISTS (
                  SELECT 1 FROM workspace_members m
                  WHERE m.workspace_id = w.id AND m.user_id <> $1 AND m.status = 'active'
              )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_select_only_counts_active_members() {
        assert!(WITH_ROLE_SELECT.contains("m.status = 'active'"));
        assert!(WITH_ROLE_SELECT.contains("c.status = 'active'"));
    }
}
