//! Workspace membership repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{Invitation, MemberStatus, MemberWithUser, WorkspaceMember, WorkspaceRole};

use crate::repository::{RepositoryError, RepositoryResult};

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<WorkspaceMember>>;

    async fn find(
        &self,
        workspace_id: Id,
        user_id: Id,
    ) -> RepositoryResult<Option<WorkspaceMember>>;

    /// Active and invited members with their profile; declined rows are hidden
    async fn list_by_workspace(&self, workspace_id: Id) -> RepositoryResult<Vec<MemberWithUser>>;

    /// `(workspace_id, role)` of every active membership
    async fn active_roles_for_user(
        &self,
        user_id: Id,
    ) -> RepositoryResult<Vec<(Id, WorkspaceRole)>>;

    async fn pending_invitations(&self, user_id: Id) -> RepositoryResult<Vec<Invitation>>;

    /// Insert an invitation, or revive a previously declined one.
    ///
    /// Fails with a conflict when the user is already invited or active.
    async fn invite(
        &self,
        workspace_id: Id,
        user_id: Id,
        role: WorkspaceRole,
        invited_by_id: Id,
    ) -> RepositoryResult<WorkspaceMember>;

    /// Setting `Active` also stamps `joined_at`
    async fn set_status(&self, id: Id, status: MemberStatus)
        -> RepositoryResult<WorkspaceMember>;

    async fn set_role(&self, id: Id, role: WorkspaceRole) -> RepositoryResult<WorkspaceMember>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL membership repository
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberStore for MemberRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<WorkspaceMember>> {
        let member =
            sqlx::query_as::<_, WorkspaceMember>("SELECT * FROM workspace_members WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(member)
    }

    async fn find(
        &self,
        workspace_id: Id,
        user_id: Id,
    ) -> RepositoryResult<Option<WorkspaceMember>> {
        let member = sqlx::query_as::<_, WorkspaceMember>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn list_by_workspace(&self, workspace_id: Id) -> RepositoryResult<Vec<MemberWithUser>> {
        let members = sqlx::query_as::<_, MemberWithUser>(
            r#"
            SELECT m.*, u.name AS user_name, u.email AS user_email,
                   u.avatar_url AS user_avatar_url
            FROM workspace_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.workspace_id = $1 AND m.status <> 'declined'
            ORDER BY CASE m.role
                         WHEN 'owner' THEN 0 WHEN 'admin' THEN 1
                         WHEN 'member' THEN 2 ELSE 3
                     END,
                     LOWER(u.name), m.id
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn active_roles_for_user(
        &self,
        user_id: Id,
    ) -> RepositoryResult<Vec<(Id, WorkspaceRole)>> {
        let roles = sqlx::query_as::<_, (Id, WorkspaceRole)>(
            r#"
            SELECT workspace_id, role FROM workspace_members
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn pending_invitations(&self, user_id: Id) -> RepositoryResult<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT m.workspace_id, w.name AS workspace_name, m.role, m.invited_by_id,
                   i.name AS invited_by_name, m.updated_at AS invited_at
            FROM workspace_members m
            JOIN workspaces w ON w.id = m.workspace_id
            LEFT JOIN users i ON i.id = m.invited_by_id
            WHERE m.user_id = $1 AND m.status = 'invited'
            ORDER BY m.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    async fn invite(
        &self,
        workspace_id: Id,
        user_id: Id,
        role: WorkspaceRole,
        invited_by_id: Id,
    ) -> RepositoryResult<WorkspaceMember> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            INSERT INTO workspace_members (
                workspace_id, user_id, role, status, invited_by_id, created_at, updated_at
            ) VALUES ($1, $2, $3, 'invited', $4, NOW(), NOW())
            ON CONFLICT (workspace_id, user_id) DO UPDATE SET
                role = EXCLUDED.role,
                status = 'invited',
                invited_by_id = EXCLUDED.invited_by_id,
                joined_at = NULL,
                updated_at = NOW()
            WHERE workspace_members.status = 'declined'
            RETURNING *
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .bind(invited_by_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict("User is already a member or has a pending invitation".into())
        })
    }

    async fn set_status(
        &self,
        id: Id,
        status: MemberStatus,
    ) -> RepositoryResult<WorkspaceMember> {
        let member = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            UPDATE workspace_members SET
                status = $1,
                joined_at = CASE WHEN $1 = 'active' THEN NOW() ELSE joined_at END,
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Member", id))?;

        Ok(member)
    }

    async fn set_role(&self, id: Id, role: WorkspaceRole) -> RepositoryResult<WorkspaceMember> {
        let member = sqlx::query_as::<_, WorkspaceMember>(
            "UPDATE workspace_members SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Member", id))?;

        Ok(member)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM workspace_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Member", id));
        }

        Ok(())
    }
}
