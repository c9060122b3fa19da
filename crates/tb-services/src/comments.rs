//! Task comments

use std::sync::Arc;

use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{CommentContract, Contract};
use tb_core::{Id, TbResult};
use tb_db::{CommentStore, PaginatedResult, Pagination, TaskStore};
use tb_models::{
    ActivityAction, Comment, CommentWithAuthor, CreateCommentRequest, EntityType, NewActivity,
    NotificationKind, Task, UpdateCommentRequest,
};
use tb_notifications::{NotificationEvent, NotificationService};

use crate::activity::ActivityService;
use crate::base::{found, preview, visible};

/// Characters of a comment quoted in its notification
const PREVIEW_CHARS: usize = 100;

pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    tasks: Arc<dyn TaskStore>,
    activity: Arc<ActivityService>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        tasks: Arc<dyn TaskStore>,
        activity: Arc<ActivityService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            comments,
            tasks,
            activity,
            notifications,
        }
    }

    async fn task(&self, user: &CurrentUser, task_id: Id) -> TbResult<Task> {
        visible(user, self.tasks.find_by_id(task_id).await?, "Task", task_id)
    }

    async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<(Comment, Task)> {
        let comment = found(self.comments.find_by_id(id).await?, "Comment", id)?;
        let task = self.tasks.find_by_id(comment.task_id).await?;
        let task = visible(user, task, "Comment", id)?;
        Ok((comment, task))
    }

    pub async fn list(
        &self,
        user: &CurrentUser,
        task_id: Id,
        pagination: Pagination,
    ) -> TbResult<PaginatedResult<CommentWithAuthor>> {
        let task = self.task(user, task_id).await?;
        CommentContract::new(user).view(&task)?;
        Ok(self.comments.list_by_task(task.id, pagination).await?)
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        task_id: Id,
        request: CreateCommentRequest,
    ) -> TbResult<CommentWithAuthor> {
        let task = self.task(user, task_id).await?;
        let contract = CommentContract::new(user);
        contract.create(&task)?;
        contract.validate(&request)?;

        let created = self
            .comments
            .create(task.id, user.id, request.content.trim())
            .await?;
        let comment = &created.comment;

        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Commented, EntityType::Comment, comment.id)
                    .in_workspace(task.workspace_id)
                    .on_task(task.id)
                    .with_details(json!({ "preview": preview(&comment.content, PREVIEW_CHARS) })),
            )
            .await;

        let mut recipients = vec![task.creator_id];
        recipients.extend(task.assignee_id);
        self.notifications
            .notify(
                NotificationEvent::new(
                    NotificationKind::TaskCommented,
                    format!("New comment on {}", task.title),
                    format!(
                        "{}: {}",
                        user.name,
                        preview(&comment.content, PREVIEW_CHARS)
                    ),
                )
                .by(user.id)
                .to_all(recipients)
                .in_workspace(task.workspace_id)
                .on_task(task.id),
            )
            .await;
        Ok(created)
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        request: UpdateCommentRequest,
    ) -> TbResult<CommentWithAuthor> {
        let (comment, task) = self.load(user, id).await?;
        let contract = CommentContract::new(user);
        contract.edit(&comment)?;
        contract.validate(&request)?;

        let updated = self
            .comments
            .update(comment.id, request.content.trim())
            .await?;
        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Updated, EntityType::Comment, comment.id)
                    .in_workspace(task.workspace_id)
                    .on_task(task.id),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let (comment, task) = self.load(user, id).await?;
        CommentContract::new(user).delete(&comment, &task)?;

        self.comments.delete(comment.id).await?;
        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Deleted, EntityType::Comment, comment.id)
                    .in_workspace(task.workspace_id)
                    .on_task(task.id),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{recorded_activity, recorded_notifications, task, user_with};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tb_db::{MockCommentStore, MockTaskStore};
    use tb_models::WorkspaceRole;

    fn comment(id: Id, task_id: Id, user_id: Id, content: &str) -> Comment {
        Comment {
            id,
            task_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn with_author(comment: Comment) -> CommentWithAuthor {
        CommentWithAuthor {
            author_name: format!("User {}", comment.user_id),
            author_avatar_url: None,
            comment,
        }
    }

    /// Task 5 in workspace 10, created by 1 and assigned to 2
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
    async fn test_create_notifies_creator_and_assignee() {
        let mut comments = MockCommentStore::new();
        comments
            .expect_create()
            .with(eq(5), eq(3), eq("Looks good"))
            .times(1)
            .returning(|task_id, user_id, content| {
                Ok(with_author(comment(60, task_id, user_id, content)))
            });
        let (activity, recorded_activity) = recorded_activity();
        let (notifications, sent) = recorded_notifications();
        let service = CommentService::new(Arc::new(comments), Arc::new(tasks()), activity, notifications);

        let commenter = user_with(3, &[(10, WorkspaceRole::Member)]);
        service
            .create(
                &commenter,
                5,
                CreateCommentRequest {
                    content: " Looks good ".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            recorded_activity.lock().unwrap()[0].action,
            ActivityAction::Commented
        );
        let sent = sent.lock().unwrap();
        let recipients: Vec<Id> = sent.iter().map(|n| n.user_id).collect();
        assert_eq!(recipients, vec![1, 2]);
        assert!(sent.iter().all(|n| n.kind == NotificationKind::TaskCommented));
        assert_eq!(sent[0].message, "User 3: Looks good");
    }

    #[tokio::test]
    async fn test_viewer_cannot_comment() {
        let mut comments = MockCommentStore::new();
        comments.expect_create().never();
        let (activity, _) = recorded_activity();
        let (notifications, _) = recorded_notifications();
        let service = CommentService::new(Arc::new(comments), Arc::new(tasks()), activity, notifications);

        let viewer = user_with(4, &[(10, WorkspaceRole::Viewer)]);
        let err = service
            .create(
                &viewer,
                5,
                CreateCommentRequest {
                    content: "hi".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_only_author_edits() {
        let mut comments = MockCommentStore::new();
        comments
            .expect_find_by_id()
            .returning(|id| Ok(Some(comment(id, 5, 2, "first"))));
        comments.expect_update().never();
        let (activity, _) = recorded_activity();
        let (notifications, _) = recorded_notifications();
        let service = CommentService::new(Arc::new(comments), Arc::new(tasks()), activity, notifications);

        let owner = user_with(1, &[(10, WorkspaceRole::Owner)]);
        let err = service
            .update(
                &owner,
                60,
                UpdateCommentRequest {
                    content: "edited".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_moderator_deletes_others_comment() {
        let mut comments = MockCommentStore::new();
        comments
            .expect_find_by_id()
            .returning(|id| Ok(Some(comment(id, 5, 2, "spam"))));
        comments
            .expect_delete()
            .with(eq(60))
            .times(1)
            .returning(|_| Ok(()));
        let (activity, recorded) = recorded_activity();
        let (notifications, _) = recorded_notifications();
        let service = CommentService::new(Arc::new(comments), Arc::new(tasks()), activity, notifications);

        let admin = user_with(7, &[(10, WorkspaceRole::Admin)]);
        service.delete(&admin, 60).await.unwrap();
        assert_eq!(recorded.lock().unwrap()[0].action, ActivityAction::Deleted);
    }
}
