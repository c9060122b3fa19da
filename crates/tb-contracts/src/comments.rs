//! Comment guards and contracts

use tb_core::{TbResult, ValidationErrors};
use tb_models::{Comment, CreateCommentRequest, Task, UpdateCommentRequest};

use crate::base::{authorize, validate_required_text, Contract, UserContext, ValidationResult};
use crate::permissions;
use crate::tasks::TaskContract;

pub const CONTENT_MAX: usize = 5000;

pub struct CommentContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> CommentContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    pub fn view(&self, task: &Task) -> TbResult<()> {
        TaskContract::new(self.user).view(task)
    }

    pub fn create(&self, task: &Task) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::ADD_COMMENTS, task.workspace_id),
            "You cannot comment on tasks in this workspace",
        )
    }

    pub fn edit(&self, comment: &Comment) -> TbResult<()> {
        authorize(
            comment.user_id == self.user.user_id(),
            "Only the author can edit a comment",
        )
    }

    pub fn delete(&self, comment: &Comment, task: &Task) -> TbResult<()> {
        let allowed = comment.user_id == self.user.user_id()
            || self
                .user
                .allowed_in_workspace(permissions::MODERATE_COMMENTS, task.workspace_id);
        authorize(allowed, "You are not allowed to delete this comment")
    }
}

impl<U: UserContext> Contract<CreateCommentRequest> for CommentContract<'_, U> {
    fn validate(&self, request: &CreateCommentRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "content", &request.content, CONTENT_MAX);
        errors.into_result()
    }
}

impl<U: UserContext> Contract<UpdateCommentRequest> for CommentContract<'_, U> {
    fn validate(&self, request: &UpdateCommentRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "content", &request.content, CONTENT_MAX);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, MockUser};
    use chrono::Utc;
    use tb_models::WorkspaceRole;

    fn comment(user_id: i64) -> Comment {
        Comment {
            id: 1,
            task_id: 42,
            user_id,
            content: "Looks good".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_author_edits() {
        let user = MockUser::new(3).with_role(1, WorkspaceRole::Admin);
        let contract = CommentContract::new(&user);
        assert!(contract.edit(&comment(3)).is_ok());
        assert!(contract.edit(&comment(4)).is_err());
    }

    #[test]
    fn test_delete_by_author_or_moderator() {
        let parent = task(1, 1, None);
        let author = MockUser::new(3).with_role(1, WorkspaceRole::Member);
        let moderator = MockUser::new(4).with_role(1, WorkspaceRole::Admin);
        let other = MockUser::new(5).with_role(1, WorkspaceRole::Member);

        assert!(CommentContract::new(&author).delete(&comment(3), &parent).is_ok());
        assert!(CommentContract::new(&moderator).delete(&comment(3), &parent).is_ok());
        assert!(CommentContract::new(&other).delete(&comment(3), &parent).is_err());
    }

    #[test]
    fn test_viewer_cannot_comment() {
        let viewer = MockUser::new(5).with_role(1, WorkspaceRole::Viewer);
        let contract = CommentContract::new(&viewer);
        assert!(contract.view(&task(1, 1, None)).is_ok());
        assert!(contract.create(&task(1, 1, None)).is_err());
    }

    #[test]
    fn test_validate_content() {
        let user = MockUser::new(1);
        let contract = CommentContract::new(&user);
        let too_long = CreateCommentRequest {
            content: "a".repeat(CONTENT_MAX + 1),
        };
        assert!(contract.validate(&too_long).unwrap_err().has_error("content"));
    }
}
