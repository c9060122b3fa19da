use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{Contract, TaskContract};
use tb_core::TbResult;
use tb_models::{ActivityAction, CreateTaskDto, CreateTaskRequest, EntityType, NewActivity, Task};
use tracing::info;

use super::TaskService;
use crate::base::{require_member, trimmed};

impl TaskService {
    pub async fn create(&self, user: &CurrentUser, request: CreateTaskRequest) -> TbResult<Task> {
        let workspace_id = request.workspace_id;
        require_member(user, workspace_id)?;
        let contract = TaskContract::new(user);
        contract.create(workspace_id)?;
        contract.validate(&request)?;
        self.validate_links(user, workspace_id, request.assignee_id, request.category_id)
            .await?;

        let status = request.status.unwrap_or_default();
        let task = self
            .tasks
            .create(CreateTaskDto {
                workspace_id,
                title: request.title.trim().to_string(),
                description: trimmed(request.description).filter(|d| !d.is_empty()),
                status,
                priority: request.priority.unwrap_or_default(),
                start_date: request.start_date,
                due_date: request.due_date,
                category_id: request.category_id,
                creator_id: user.id,
                assignee_id: request.assignee_id,
            })
            .await?;
        info!(task_id = task.id, workspace_id, user_id = user.id, "Task created");

        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Created, EntityType::Task, task.id)
                    .in_workspace(workspace_id)
                    .on_task(task.id)
                    .with_details(json!({ "title": task.title })),
            )
            .await;
        self.notify_assigned(user, &task).await;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Harness;
    use super::*;
    use crate::test_support::{task, user_with};
    use tb_models::{NotificationKind, TaskPriority, TaskStatus, WorkspaceRole};

    fn request() -> CreateTaskRequest {
        CreateTaskRequest {
            workspace_id: 10,
            title: " Draft release notes ".into(),
            description: None,
            status: None,
            priority: None,
            start_date: None,
            due_date: None,
            category_id: None,
            assignee_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_notifies_assignee() {
        let mut harness = Harness::new();
        harness
            .tasks
            .expect_create()
            .withf(|dto| {
                dto.title == "Draft release notes"
                    && dto.status == TaskStatus::Todo
                    && dto.priority == TaskPriority::Medium
                    && dto.creator_id == 1
            })
            .times(1)
            .returning(|dto| {
                Ok(Task {
                    title: dto.title,
                    assignee_id: dto.assignee_id,
                    category_id: dto.category_id,
                    ..task(50, dto.workspace_id)
                })
            });
        let (service, activity, notifications) = harness.build();

        let owner = user_with(1, &[(10, WorkspaceRole::Owner)]);
        let created = service
            .create(
                &owner,
                CreateTaskRequest {
                    assignee_id: Some(2),
                    category_id: Some(20),
                    ..request()
                },
            )
            .await
            .unwrap();

        assert_eq!(created.id, 50);
        let activity = activity.lock().unwrap();
        assert_eq!(activity[0].action, ActivityAction::Created);
        assert_eq!(activity[0].task_id, Some(50));
        let sent = notifications.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, 2);
        assert_eq!(sent[0].kind, NotificationKind::TaskAssigned);
    }

    #[tokio::test]
    async fn test_self_assignment_sends_nothing() {
        let mut harness = Harness::new();
        harness.tasks.expect_create().returning(|dto| {
            Ok(Task {
                assignee_id: dto.assignee_id,
                ..task(51, dto.workspace_id)
            })
        });
        let (service, _, notifications) = harness.build();

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        service
            .create(
                &member,
                CreateTaskRequest {
                    assignee_id: Some(2),
                    ..request()
                },
            )
            .await
            .unwrap();
        assert!(notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_viewer_cannot_create() {
        let mut harness = Harness::new();
        harness.tasks.expect_create().never();
        let (service, _, _) = harness.build();

        let viewer = user_with(3, &[(10, WorkspaceRole::Viewer)]);
        let err = service.create(&viewer, request()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_rejects_assignee_outside_workspace() {
        let mut harness = Harness::new();
        harness.tasks.expect_create().never();
        let (service, _, _) = harness.build();

        let owner = user_with(1, &[(10, WorkspaceRole::Owner)]);
        let err = service
            .create(
                &owner,
                CreateTaskRequest {
                    assignee_id: Some(77),
                    ..request()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("assigneeId must be an active member"));
    }

    #[tokio::test]
    async fn test_due_before_start_is_invalid() {
        let mut harness = Harness::new();
        harness.tasks.expect_create().never();
        let (service, _, _) = harness.build();

        let now = chrono::Utc::now();
        let owner = user_with(1, &[(10, WorkspaceRole::Owner)]);
        let err = service
            .create(
                &owner,
                CreateTaskRequest {
                    start_date: Some(now),
                    due_date: Some(now - chrono::Duration::days(1)),
                    ..request()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("startDate"));
    }
}
