//! Task service
//!
//! Split the way the write paths are: [`create`], [`update`] (which also backs
//! assign and status changes) and [`delete`]. Reads live here.

mod create;
mod delete;
mod update;

use std::sync::Arc;

use tb_auth::CurrentUser;
use tb_contracts::TaskContract;
use tb_core::{Id, TbResult, ValidationErrors};
use tb_db::{CategoryStore, MemberStore, PaginatedResult, TaskScope, TaskStore};
use tb_models::{NotificationKind, Task};
use tb_notifications::{NotificationEvent, NotificationService};
use tb_queries::TaskQuery;

use crate::activity::ActivityService;
use crate::base::{require_member, visible};

pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    members: Arc<dyn MemberStore>,
    categories: Arc<dyn CategoryStore>,
    activity: Arc<ActivityService>,
    notifications: Arc<NotificationService>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        members: Arc<dyn MemberStore>,
        categories: Arc<dyn CategoryStore>,
        activity: Arc<ActivityService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            tasks,
            members,
            categories,
            activity,
            notifications,
        }
    }

    /// Load a task in one of the caller's workspaces
    pub(crate) async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<Task> {
        visible(user, self.tasks.find_by_id(id).await?, "Task", id)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> TbResult<Task> {
        let task = self.load(user, id).await?;
        TaskContract::new(user).view(&task)?;
        Ok(task)
    }

    /// Tasks across the caller's workspaces, or one of them when filtered
    pub async fn list(
        &self,
        user: &CurrentUser,
        query: TaskQuery,
    ) -> TbResult<PaginatedResult<Task>> {
        if let Some(workspace_id) = query.filters.workspace_id {
            require_member(user, workspace_id)?;
        }
        let scope = TaskScope::new(user.id, user.workspace_ids());
        Ok(self.tasks.query(query, scope).await?)
    }

    /// Check that assignee and category fit the task's workspace
    async fn validate_links(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        assignee_id: Option<Id>,
        category_id: Option<Id>,
    ) -> TbResult<()> {
        let contract = TaskContract::new(user);
        let mut errors = ValidationErrors::new();

        if let Some(assignee_id) = assignee_id {
            let membership = self.members.find(workspace_id, assignee_id).await?;
            if let Err(e) = contract.validate_assignee(workspace_id, membership.as_ref()) {
                errors.merge(e);
            }
        }
        if let Some(category_id) = category_id {
            let category = self.categories.find_by_id(category_id).await?;
            if let Err(e) = contract.validate_category(workspace_id, category.as_ref()) {
                errors.merge(e);
            }
        }

        Ok(errors.into_result()?)
    }

    async fn notify_assigned(&self, user: &CurrentUser, task: &Task) {
        let Some(assignee_id) = task.assignee_id else {
            return;
        };
        self.notifications
            .notify(
                NotificationEvent::new(
                    NotificationKind::TaskAssigned,
                    format!("Task assigned: {}", task.title),
                    format!("{} assigned you to \"{}\"", user.name, task.title),
                )
                .by(user.id)
                .to(assignee_id)
                .in_workspace(task.workspace_id)
                .on_task(task.id),
            )
            .await;
    }
}
