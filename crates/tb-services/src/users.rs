//! Profile, password and account management

use std::sync::Arc;

use tb_auth::{hash_password, verify_password, CurrentUser};
use tb_contracts::{PasswordContract, RegistrationContract};
use tb_core::{TbError, TbResult};
use tb_db::{UserStore, WorkspaceStore};
use tb_models::{ChangePasswordRequest, UpdateProfileRequest, UpdateUserDto, User, UserSummary};
use tracing::info;

use crate::base::{found, trimmed};

pub const SEARCH_MIN_CHARS: usize = 2;
pub const SEARCH_LIMIT: i64 = 20;

pub struct UserService {
    users: Arc<dyn UserStore>,
    workspaces: Arc<dyn WorkspaceStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, workspaces: Arc<dyn WorkspaceStore>) -> Self {
        Self { users, workspaces }
    }

    pub async fn profile(&self, user: &CurrentUser) -> TbResult<User> {
        found(self.users.find_by_id(user.id).await?, "User", user.id)
    }

    pub async fn update_profile(
        &self,
        user: &CurrentUser,
        request: UpdateProfileRequest,
    ) -> TbResult<User> {
        RegistrationContract::validate_profile(&request)?;
        let dto = UpdateUserDto {
            name: trimmed(request.name),
            avatar_url: request.avatar_url,
            email_notifications: request.email_notifications,
        };
        Ok(self.users.update_profile(user.id, dto).await?)
    }

    /// The current password is required whenever the account has one
    pub async fn change_password(
        &self,
        user: &CurrentUser,
        request: ChangePasswordRequest,
    ) -> TbResult<()> {
        let account = self.profile(user).await?;

        if let Some(hash) = account.password_hash.as_deref() {
            match request.current_password.as_deref() {
                None | Some("") => return Err(TbError::invalid("currentPassword", "can't be blank")),
                Some(current) if !verify_password(current, hash) => {
                    return Err(TbError::invalid("currentPassword", "is incorrect"))
                }
                Some(_) => {}
            }
        }
        PasswordContract::validate("newPassword", &request.new_password)?;

        let hash = hash_password(&request.new_password)?;
        self.users.set_password(user.id, &hash).await?;
        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    pub async fn search(&self, term: &str) -> TbResult<Vec<UserSummary>> {
        let term = term.trim();
        if term.chars().count() < SEARCH_MIN_CHARS {
            return Err(TbError::invalid(
                "q",
                format!("is too short (minimum is {SEARCH_MIN_CHARS} characters)"),
            ));
        }
        Ok(self.users.search(term, SEARCH_LIMIT).await?)
    }

    /// Refused while the user still owns shared workspaces with other members
    pub async fn delete_account(&self, user: &CurrentUser) -> TbResult<()> {
        let owned = self.workspaces.count_shared_owned_by(user.id).await?;
        if owned > 0 {
            return Err(TbError::conflict(format!(
                "Transfer ownership of your {owned} shared workspace(s) before deleting your account"
            )));
        }
        self.users.delete(user.id).await?;
        info!(user_id = user.id, "Account deleted");
        Ok(())
    }
}
