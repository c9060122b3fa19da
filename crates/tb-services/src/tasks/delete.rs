use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::TaskContract;
use tb_core::{Id, TbResult};
use tb_models::{ActivityAction, EntityType, NewActivity};
use tracing::info;

use super::TaskService;

impl TaskService {
    /// Subtasks, comments and attachment rows go with the task
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let task = self.load(user, id).await?;
        TaskContract::new(user).delete(&task)?;

        self.tasks.delete(task.id).await?;
        info!(task_id = task.id, user_id = user.id, "Task deleted");

        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Deleted, EntityType::Task, task.id)
                    .in_workspace(task.workspace_id)
                    .with_details(json!({ "title": task.title })),
            )
            .await;
        Ok(())
    }
}
