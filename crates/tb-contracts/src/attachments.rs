//! Attachment guards

use tb_core::TbResult;
use tb_models::{Attachment, Task};

use crate::base::{authorize, UserContext};
use crate::permissions;
use crate::tasks::TaskContract;

pub struct AttachmentContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> AttachmentContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    /// Listing and downloading
    pub fn view(&self, task: &Task) -> TbResult<()> {
        TaskContract::new(self.user).view(task)
    }

    pub fn upload(&self, task: &Task) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::ADD_ATTACHMENTS, task.workspace_id),
            "You cannot attach files to tasks in this workspace",
        )
    }

    pub fn delete(&self, attachment: &Attachment, task: &Task) -> TbResult<()> {
        let allowed = attachment.uploader_id == Some(self.user.user_id())
            || self
                .user
                .allowed_in_workspace(permissions::EDIT_TASKS, task.workspace_id);
        authorize(allowed, "You are not allowed to delete this attachment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, MockUser};
    use chrono::Utc;
    use tb_models::WorkspaceRole;

    fn attachment(uploader_id: Option<i64>) -> Attachment {
        Attachment {
            id: 1,
            task_id: 42,
            uploader_id,
            filename: "report.pdf".into(),
            storage_key: "tasks/42/abc-report.pdf".into(),
            content_type: "application/pdf".into(),
            file_size: 2048,
            digest: "deadbeef".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_upload_requires_contributor() {
        let viewer = MockUser::new(2).with_role(1, WorkspaceRole::Viewer);
        let member = MockUser::new(3).with_role(1, WorkspaceRole::Member);
        let parent = task(1, 1, None);

        assert!(AttachmentContract::new(&viewer).view(&parent).is_ok());
        assert!(AttachmentContract::new(&viewer).upload(&parent).is_err());
        assert!(AttachmentContract::new(&member).upload(&parent).is_ok());
    }

    #[test]
    fn test_delete_by_uploader_or_editor() {
        let parent = task(1, 1, None);
        let uploader = MockUser::new(3).with_role(1, WorkspaceRole::Member);
        let other = MockUser::new(4).with_role(1, WorkspaceRole::Member);
        let admin = MockUser::new(5).with_role(1, WorkspaceRole::Admin);

        assert!(AttachmentContract::new(&uploader)
            .delete(&attachment(Some(3)), &parent)
            .is_ok());
        assert!(AttachmentContract::new(&other)
            .delete(&attachment(Some(3)), &parent)
            .is_err());
        assert!(AttachmentContract::new(&admin)
            .delete(&attachment(None), &parent)
            .is_ok());
    }
}
