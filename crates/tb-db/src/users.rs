//! User repository

use async_trait::async_trait;
use sqlx::PgPool;
use tb_core::Id;
use tb_models::{CreateUserDto, CreateWorkspaceDto, UpdateUserDto, User, UserSummary};

use crate::repository::{like_pattern, RepositoryError, RepositoryResult};
use crate::workspaces::insert_workspace;

pub const EMAIL_TAKEN: &str = "Email has already been taken";

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_oauth(&self, provider: &str, subject: &str)
        -> RepositoryResult<Option<User>>;

    /// Insert the user, a personal workspace named `workspace_name` and the
    /// owner membership in one transaction
    async fn create_with_personal_workspace(
        &self,
        dto: CreateUserDto,
        workspace_name: &str,
    ) -> RepositoryResult<User>;

    async fn update_profile(&self, id: Id, dto: UpdateUserDto) -> RepositoryResult<User>;

    async fn set_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()>;

    /// Attach an OAuth identity to an existing account
    async fn link_oauth(
        &self,
        id: Id,
        provider: &str,
        subject: &str,
        avatar_url: Option<String>,
    ) -> RepositoryResult<User>;

    /// Invalidate every issued token; returns the new version
    async fn bump_token_version(&self, id: Id) -> RepositoryResult<i32>;

    async fn record_login(&self, id: Id) -> RepositoryResult<()>;

    /// Name or email contains `term`
    async fn search(&self, term: &str, limit: i64) -> RepositoryResult<Vec<UserSummary>>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        subject: &str,
    ) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE oauth_provider = $1 AND oauth_subject = $2",
        )
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_with_personal_workspace(
        &self,
        dto: CreateUserDto,
        workspace_name: &str,
    ) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                name, email, password_hash, avatar_url, oauth_provider, oauth_subject,
                created_at, updated_at
            ) VALUES ($1, LOWER($2), $3, $4, $5, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.email.trim())
        .bind(&dto.password_hash)
        .bind(&dto.avatar_url)
        .bind(&dto.oauth_provider)
        .bind(&dto.oauth_subject)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, EMAIL_TAKEN))?;

        let workspace = CreateWorkspaceDto {
            name: workspace_name.to_string(),
            description: None,
            owner_id: user.id,
            is_personal: true,
        };
        insert_workspace(&mut *tx, &workspace).await?;

        tx.commit().await?;
        tracing::debug!(user_id = user.id, "User created with personal workspace");

        Ok(user)
    }

    async fn update_profile(&self, id: Id, dto: UpdateUserDto) -> RepositoryResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($1, name),
                avatar_url = CASE WHEN $2 THEN $3 ELSE avatar_url END,
                email_notifications = COALESCE($4, email_notifications),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.avatar_url.is_some())
        .bind(dto.avatar_url.clone().flatten())
        .bind(dto.email_notifications)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("User", id))?;

        Ok(user)
    }

    async fn set_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
                .bind(password_hash)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }

        Ok(())
    }

    async fn link_oauth(
        &self,
        id: Id,
        provider: &str,
        subject: &str,
        avatar_url: Option<String>,
    ) -> RepositoryResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                oauth_provider = $1,
                oauth_subject = $2,
                avatar_url = COALESCE(avatar_url, $3),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(provider)
        .bind(subject)
        .bind(avatar_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("User", id))?;

        Ok(user)
    }

    async fn bump_token_version(&self, id: Id) -> RepositoryResult<i32> {
        let version = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users SET token_version = token_version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING token_version
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("User", id))?;

        Ok(version)
    }

    async fn record_login(&self, id: Id) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn search(&self, term: &str, limit: i64) -> RepositoryResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, avatar_url
            FROM users
            WHERE name ILIKE $1 OR email ILIKE $1
            ORDER BY LOWER(name), id
            LIMIT $2
            "#,
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }

        Ok(())
    }
}
