//! Checklist items of a task

use std::sync::Arc;

use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{Contract, SubTaskContract};
use tb_core::{Id, TbResult};
use tb_db::{SubTaskStore, TaskStore};
use tb_models::{
    ActivityAction, CreateSubTaskRequest, EntityType, NewActivity, SubTask, Task,
    UpdateSubTaskDto, UpdateSubTaskRequest,
};

use crate::activity::ActivityService;
use crate::base::{found, visible};

pub struct SubTaskService {
    subtasks: Arc<dyn SubTaskStore>,
    tasks: Arc<dyn TaskStore>,
    activity: Arc<ActivityService>,
}

impl SubTaskService {
    pub fn new(
        subtasks: Arc<dyn SubTaskStore>,
        tasks: Arc<dyn TaskStore>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            subtasks,
            tasks,
            activity,
        }
    }

    async fn parent(&self, user: &CurrentUser, task_id: Id) -> TbResult<Task> {
        visible(user, self.tasks.find_by_id(task_id).await?, "Task", task_id)
    }

    async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<(SubTask, Task)> {
        let subtask = found(self.subtasks.find_by_id(id).await?, "SubTask", id)?;
        let parent = self.tasks.find_by_id(subtask.task_id).await?;
        let parent = visible(user, parent, "SubTask", id)?;
        Ok((subtask, parent))
    }

    async fn record(
        &self,
        user: &CurrentUser,
        action: ActivityAction,
        subtask: &SubTask,
        parent: &Task,
    ) {
        self.activity
            .record(
                NewActivity::new(user.id, action, EntityType::Subtask, subtask.id)
                    .in_workspace(parent.workspace_id)
                    .on_task(parent.id)
                    .with_details(json!({
                        "title": subtask.title,
                        "completed": subtask.is_completed,
                    })),
            )
            .await;
    }

    pub async fn list(&self, user: &CurrentUser, task_id: Id) -> TbResult<Vec<SubTask>> {
        let parent = self.parent(user, task_id).await?;
        SubTaskContract::new(user).view(&parent)?;
        Ok(self.subtasks.list_by_task(parent.id).await?)
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        task_id: Id,
        request: CreateSubTaskRequest,
    ) -> TbResult<SubTask> {
        let parent = self.parent(user, task_id).await?;
        let contract = SubTaskContract::new(user);
        contract.manage(&parent)?;
        contract.validate(&request)?;

        let subtask = self
            .subtasks
            .create(parent.id, request.title.trim())
            .await?;
        self.record(user, ActivityAction::Created, &subtask, &parent)
            .await;
        Ok(subtask)
    }

    /// Changing only `isCompleted` is allowed to the parent's assignee too
    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        request: UpdateSubTaskRequest,
    ) -> TbResult<SubTask> {
        let (subtask, parent) = self.load(user, id).await?;
        let contract = SubTaskContract::new(user);
        if request.is_toggle_only() {
            contract.toggle(&parent)?;
        } else {
            contract.manage(&parent)?;
        }
        contract.validate(&request)?;

        let updated = self
            .subtasks
            .update(subtask.id, UpdateSubTaskDto::from(request))
            .await?;
        self.record(user, ActivityAction::Updated, &updated, &parent)
            .await;
        Ok(updated)
    }

    pub async fn toggle(&self, user: &CurrentUser, id: Id) -> TbResult<SubTask> {
        let (subtask, parent) = self.load(user, id).await?;
        SubTaskContract::new(user).toggle(&parent)?;

        let updated = self
            .subtasks
            .update(
                subtask.id,
                UpdateSubTaskDto {
                    is_completed: Some(!subtask.is_completed),
                    ..Default::default()
                },
            )
            .await?;
        self.record(user, ActivityAction::Updated, &updated, &parent)
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let (subtask, parent) = self.load(user, id).await?;
        SubTaskContract::new(user).manage(&parent)?;

        self.subtasks.delete(subtask.id).await?;
        self.record(user, ActivityAction::Deleted, &subtask, &parent)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{recorded_activity, task, user_with};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tb_db::{MockSubTaskStore, MockTaskStore};
    use tb_models::WorkspaceRole;

    fn subtask(id: Id, task_id: Id, is_completed: bool) -> SubTask {
        SubTask {
            id,
            task_id,
            title: format!("Step {id}"),
            is_completed,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Task 5 in workspace 10, created by user 1 and assigned to user 2
    fn tasks() -> MockTaskStore {
        let mut tasks = MockTaskStore::new();
        tasks.expect_find_by_id().returning(|id| {
            Ok(Some(Task {
                assignee_id: Some(2),
                ..task(id, 10)
            }))
        });
        tasks
    }

    #[tokio::test]
    async fn test_assignee_toggles_without_edit_rights() {
        let mut subtasks = MockSubTaskStore::new();
        subtasks
            .expect_find_by_id()
            .returning(|id| Ok(Some(subtask(id, 5, false))));
        subtasks
            .expect_update()
            .withf(|id, dto| *id == 30 && dto.is_completed == Some(true) && dto.title.is_none())
            .times(1)
            .returning(|id, _| Ok(subtask(id, 5, true)));
        let (activity, recorded) = recorded_activity();
        let service = SubTaskService::new(Arc::new(subtasks), Arc::new(tasks()), activity);

        // Viewers cannot edit tasks, but the assignee still ticks items off
        let assignee = user_with(2, &[(10, WorkspaceRole::Viewer)]);
        let toggled = service.toggle(&assignee, 30).await.unwrap();
        assert!(toggled.is_completed);
        assert_eq!(recorded.lock().unwrap()[0].task_id, Some(5));
    }

    #[tokio::test]
    async fn test_assignee_cannot_rename_as_viewer() {
        let mut subtasks = MockSubTaskStore::new();
        subtasks
            .expect_find_by_id()
            .returning(|id| Ok(Some(subtask(id, 5, false))));
        subtasks.expect_update().never();
        let (activity, _) = recorded_activity();
        let service = SubTaskService::new(Arc::new(subtasks), Arc::new(tasks()), activity);

        let assignee = user_with(2, &[(10, WorkspaceRole::Viewer)]);
        let err = service
            .update(
                &assignee,
                30,
                UpdateSubTaskRequest {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_create_trims_title() {
        let mut subtasks = MockSubTaskStore::new();
        subtasks
            .expect_create()
            .with(eq(5), eq("Write tests"))
            .times(1)
            .returning(|task_id, title| {
                Ok(SubTask {
                    title: title.to_string(),
                    ..subtask(31, task_id, false)
                })
            });
        let (activity, _) = recorded_activity();
        let service = SubTaskService::new(Arc::new(subtasks), Arc::new(tasks()), activity);

        let owner = user_with(1, &[(10, WorkspaceRole::Owner)]);
        let created = service
            .create(
                &owner,
                5,
                CreateSubTaskRequest {
                    title: "  Write tests ".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.title, "Write tests");
    }

    #[tokio::test]
    async fn test_foreign_subtask_is_not_found() {
        let mut subtasks = MockSubTaskStore::new();
        subtasks
            .expect_find_by_id()
            .returning(|id| Ok(Some(subtask(id, 5, false))));
        subtasks.expect_delete().never();
        let (activity, _) = recorded_activity();
        let service = SubTaskService::new(Arc::new(subtasks), Arc::new(tasks()), activity);

        let stranger = user_with(9, &[(11, WorkspaceRole::Owner)]);
        let err = service.delete(&stranger, 30).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: SubTask with id=30");
    }
}
