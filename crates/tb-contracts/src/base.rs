//! Base contract system

use tb_core::{Id, TbError, TbResult, ValidationErrors};
use tb_models::WorkspaceRole;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// The acting user as contracts see it
pub trait UserContext: Send + Sync {
    fn user_id(&self) -> Id;

    /// Role of an *active* membership, `None` when not a member
    fn role_in_workspace(&self, workspace_id: Id) -> Option<WorkspaceRole>;

    fn allowed_in_workspace(&self, permission: &str, workspace_id: Id) -> bool;

    fn is_member_of(&self, workspace_id: Id) -> bool {
        self.role_in_workspace(workspace_id).is_some()
    }
}

/// Attribute validation for `T`
pub trait Contract<T: ?Sized>: Send + Sync {
    fn validate(&self, entity: &T) -> ValidationResult;
}

/// Turn a guard decision into `Forbidden`
pub fn authorize(allowed: bool, message: &str) -> TbResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(TbError::forbidden(message))
    }
}

/// Required text: not blank after trimming and at most `max` characters
pub(crate) fn validate_required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    } else {
        validate_max_length(errors, field, value, max);
    }
}

pub(crate) fn validate_max_length(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max: usize,
) {
    if value.chars().count() > max {
        errors.add(field, format!("is too long (maximum is {max} characters)"));
    }
}
