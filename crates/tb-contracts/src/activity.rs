//! Activity feed guards

use tb_core::{Id, TbResult};
use tb_models::Task;

use crate::base::{authorize, UserContext};
use crate::permissions;
use crate::tasks::TaskContract;

pub struct ActivityContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> ActivityContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    pub fn workspace_feed(&self, workspace_id: Id) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::VIEW_ACTIVITY, workspace_id),
            "You cannot view activity in this workspace",
        )
    }

    pub fn task_feed(&self, task: &Task) -> TbResult<()> {
        TaskContract::new(self.user).view(task)
    }
}
