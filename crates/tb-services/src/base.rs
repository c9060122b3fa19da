//! Helpers shared by the services

use tb_auth::CurrentUser;
use tb_contracts::UserContext;
use tb_core::{Id, TbError, TbResult, ValidationErrors, WorkspaceScoped};
use validator::Validate;

/// Turn a missing row into a 404
pub(crate) fn found<T>(value: Option<T>, entity: &'static str, id: Id) -> TbResult<T> {
    value.ok_or_else(|| TbError::not_found(entity, id))
}

/// Like [`found`], but rows in workspaces the caller does not belong to are
/// reported as missing too
pub(crate) fn visible<T: WorkspaceScoped>(
    user: &CurrentUser,
    value: Option<T>,
    entity: &'static str,
    id: Id,
) -> TbResult<T> {
    match value {
        Some(v) if user.is_member_of(v.workspace_id()) => Ok(v),
        _ => Err(TbError::not_found(entity, id)),
    }
}

pub(crate) fn require_member(user: &CurrentUser, workspace_id: Id) -> TbResult<()> {
    if user.is_member_of(workspace_id) {
        Ok(())
    } else {
        Err(TbError::not_found("Workspace", workspace_id))
    }
}

/// Run the request's `validator` derives
pub(crate) fn validate_request<R: Validate>(request: &R) -> TbResult<()> {
    request
        .validate()
        .map_err(|e| TbError::Validation(ValidationErrors::from(e)))
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis
pub(crate) fn preview(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, user_with};
    use tb_models::WorkspaceRole;

    #[test]
    fn test_visible_hides_foreign_rows() {
        let user = user_with(1, &[(10, WorkspaceRole::Member)]);
        assert!(visible(&user, Some(task(5, 10)), "Task", 5).is_ok());

        let err = visible(&user, Some(task(6, 20)), "Task", 6).unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = visible::<tb_models::Task>(&user, None, "Task", 7).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("  short  ", 10), "short");
        assert_eq!(preview("abcdefghijkl", 5), "abcd…");
    }
}
