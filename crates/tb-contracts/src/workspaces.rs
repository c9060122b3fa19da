//! Workspace guards and contracts

use tb_core::{TbResult, ValidationErrors};
use tb_models::{CreateWorkspaceRequest, UpdateWorkspaceRequest, Workspace};

use crate::base::{
    authorize, validate_max_length, validate_required_text, Contract, UserContext,
    ValidationResult,
};
use crate::permissions;

pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 1000;

pub struct WorkspaceContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> WorkspaceContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    pub fn view(&self, workspace: &Workspace) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::VIEW_WORKSPACE, workspace.id),
            "You are not a member of this workspace",
        )
    }

    pub fn update(&self, workspace: &Workspace) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::EDIT_WORKSPACE, workspace.id),
            "You are not allowed to edit this workspace",
        )
    }

    pub fn delete(&self, workspace: &Workspace) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::DELETE_WORKSPACE, workspace.id),
            "Only the owner can delete this workspace",
        )?;
        authorize(
            !workspace.is_personal,
            "Your personal workspace cannot be deleted",
        )
    }
}

impl<U: UserContext> Contract<CreateWorkspaceRequest> for WorkspaceContract<'_, U> {
    fn validate(&self, request: &CreateWorkspaceRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "name", &request.name, NAME_MAX);
        if let Some(description) = &request.description {
            validate_max_length(&mut errors, "description", description, DESCRIPTION_MAX);
        }
        errors.into_result()
    }
}

impl<U: UserContext> Contract<UpdateWorkspaceRequest> for WorkspaceContract<'_, U> {
    fn validate(&self, request: &UpdateWorkspaceRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &request.name {
            validate_required_text(&mut errors, "name", name, NAME_MAX);
        }
        if let Some(Some(description)) = &request.description {
            validate_max_length(&mut errors, "description", description, DESCRIPTION_MAX);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{workspace, MockUser};
    use tb_models::WorkspaceRole;

    #[test]
    fn test_member_can_view_but_not_edit() {
        let user = MockUser::new(2).with_role(1, WorkspaceRole::Member);
        let contract = WorkspaceContract::new(&user);
        let ws = workspace(1, 1, false);

        assert!(contract.view(&ws).is_ok());
        assert!(contract.update(&ws).is_err());
        assert!(contract.delete(&ws).is_err());
    }

    #[test]
    fn test_stranger_cannot_view() {
        let user = MockUser::new(9);
        let contract = WorkspaceContract::new(&user);
        assert!(contract.view(&workspace(1, 1, false)).is_err());
    }

    #[test]
    fn test_admin_edits_only_owner_deletes() {
        let admin = MockUser::new(2).with_role(1, WorkspaceRole::Admin);
        let owner = MockUser::new(1).with_role(1, WorkspaceRole::Owner);
        let ws = workspace(1, 1, false);

        assert!(WorkspaceContract::new(&admin).update(&ws).is_ok());
        assert!(WorkspaceContract::new(&admin).delete(&ws).is_err());
        assert!(WorkspaceContract::new(&owner).delete(&ws).is_ok());
    }

    #[test]
    fn test_personal_workspace_cannot_be_deleted() {
        let owner = MockUser::new(1).with_role(1, WorkspaceRole::Owner);
        let err = WorkspaceContract::new(&owner)
            .delete(&workspace(1, 1, true))
            .unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: Your personal workspace cannot be deleted");
    }

    #[test]
    fn test_validate_create() {
        let user = MockUser::new(1);
        let contract = WorkspaceContract::new(&user);

        let blank = CreateWorkspaceRequest {
            name: "  ".into(),
            description: Some("x".repeat(DESCRIPTION_MAX + 1)),
        };
        let errors = contract.validate(&blank).unwrap_err();
        assert!(errors.has_error("name"));
        assert!(errors.has_error("description"));

        let ok = CreateWorkspaceRequest {
            name: "Marketing".into(),
            description: None,
        };
        assert!(contract.validate(&ok).is_ok());
    }

    #[test]
    fn test_validate_update_allows_clearing_description() {
        let user = MockUser::new(1);
        let request = UpdateWorkspaceRequest {
            name: None,
            description: Some(None),
        };
        assert!(WorkspaceContract::new(&user).validate(&request).is_ok());
    }
}
