use chrono::Utc;
use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{Contract, TaskContract};
use tb_core::{Id, TbResult};
use tb_models::{
    ActivityAction, AssignTaskRequest, ChangeStatusRequest, EntityType, NewActivity,
    NotificationKind, Task, TaskStatus, UpdateTaskDto, UpdateTaskRequest,
};
use tb_notifications::NotificationEvent;
use tracing::debug;

use super::TaskService;

/// The task as it would look with `request` applied
fn apply(task: &Task, request: &UpdateTaskRequest) -> Task {
    let mut patched = task.clone();
    if let Some(title) = &request.title {
        patched.title = title.trim().to_string();
    }
    if let Some(description) = &request.description {
        patched.description = description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);
    }
    if let Some(status) = request.status {
        patched.status = status;
    }
    if let Some(priority) = request.priority {
        patched.priority = priority;
    }
    if let Some(start_date) = request.start_date {
        patched.start_date = start_date;
    }
    if let Some(due_date) = request.due_date {
        patched.due_date = due_date;
    }
    if let Some(category_id) = request.category_id {
        patched.category_id = category_id;
    }
    if let Some(assignee_id) = request.assignee_id {
        patched.assignee_id = assignee_id;
    }
    patched
}

/// Column changes between `before` and `after`; unchanged columns stay `None`
fn diff(before: &Task, after: &Task) -> UpdateTaskDto {
    fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
        (old != new).then(|| new.clone())
    }

    let status = changed(&before.status, &after.status);
    let completed_at = match status {
        Some(s) if s.is_done() => Some(Some(Utc::now())),
        Some(_) if before.status.is_done() => Some(None),
        _ => None,
    };
    let due_date = changed(&before.due_date, &after.due_date);
    let assignee_id = changed(&before.assignee_id, &after.assignee_id);

    UpdateTaskDto {
        title: changed(&before.title, &after.title),
        description: changed(&before.description, &after.description),
        status,
        priority: changed(&before.priority, &after.priority),
        start_date: changed(&before.start_date, &after.start_date),
        reset_reminder: due_date.is_some() || assignee_id.is_some(),
        due_date,
        completed_at,
        category_id: changed(&before.category_id, &after.category_id),
        assignee_id,
    }
}

fn changed_fields(dto: &UpdateTaskDto) -> Vec<&'static str> {
    [
        ("title", dto.title.is_some()),
        ("description", dto.description.is_some()),
        ("priority", dto.priority.is_some()),
        ("startDate", dto.start_date.is_some()),
        ("dueDate", dto.due_date.is_some()),
        ("categoryId", dto.category_id.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, set)| set.then_some(field))
    .collect()
}

impl TaskService {
    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        request: UpdateTaskRequest,
    ) -> TbResult<Task> {
        let task = self.load(user, id).await?;
        let contract = TaskContract::new(user);
        contract.update(&task)?;

        let patched = apply(&task, &request);
        contract.validate(&patched)?;

        let dto = diff(&task, &patched);
        if dto.is_empty() {
            debug!(task_id = task.id, "Task update without changes");
            return Ok(task);
        }
        self.validate_links(
            user,
            task.workspace_id,
            dto.assignee_id.flatten(),
            dto.category_id.flatten(),
        )
        .await?;

        let fields = changed_fields(&dto);
        let status_change = dto.status.map(|to| (task.status, to));
        let assignee_change = dto.assignee_id.map(|to| (task.assignee_id, to));

        let updated = self.tasks.update(task.id, dto).await?;
        self.record_changes(user, &updated, &fields, status_change, assignee_change)
            .await;

        match assignee_change {
            Some((_, Some(_))) => self.notify_assigned(user, &updated).await,
            _ if !fields.is_empty() || status_change.is_some() => {
                self.notify_updated(user, &updated).await
            }
            _ => {}
        }
        Ok(updated)
    }

    /// `None` unassigns
    pub async fn assign(
        &self,
        user: &CurrentUser,
        id: Id,
        request: AssignTaskRequest,
    ) -> TbResult<Task> {
        self.update(
            user,
            id,
            UpdateTaskRequest {
                assignee_id: Some(request.assignee_id),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn change_status(
        &self,
        user: &CurrentUser,
        id: Id,
        request: ChangeStatusRequest,
    ) -> TbResult<Task> {
        self.update(
            user,
            id,
            UpdateTaskRequest {
                status: Some(request.status),
                ..Default::default()
            },
        )
        .await
    }

    async fn record_changes(
        &self,
        user: &CurrentUser,
        task: &Task,
        fields: &[&'static str],
        status_change: Option<(TaskStatus, TaskStatus)>,
        assignee_change: Option<(Option<Id>, Option<Id>)>,
    ) {
        let activity = |action| {
            NewActivity::new(user.id, action, EntityType::Task, task.id)
                .in_workspace(task.workspace_id)
                .on_task(task.id)
        };

        if let Some((from, to)) = status_change {
            self.activity
                .record(
                    activity(ActivityAction::StatusChanged)
                        .with_details(json!({ "from": from, "to": to })),
                )
                .await;
        }
        if let Some((from, to)) = assignee_change {
            self.activity
                .record(
                    activity(ActivityAction::Assigned)
                        .with_details(json!({ "from": from, "to": to })),
                )
                .await;
        }
        if !fields.is_empty() {
            self.activity
                .record(activity(ActivityAction::Updated).with_details(json!({ "fields": fields })))
                .await;
        }
    }

    async fn notify_updated(&self, user: &CurrentUser, task: &Task) {
        let mut recipients = vec![task.creator_id];
        recipients.extend(task.assignee_id);
        self.notifications
            .notify(
                NotificationEvent::new(
                    NotificationKind::TaskUpdated,
                    format!("Task updated: {}", task.title),
                    format!("{} updated \"{}\"", user.name, task.title),
                )
                .by(user.id)
                .to_all(recipients)
                .in_workspace(task.workspace_id)
                .on_task(task.id),
            )
            .await;
    }
}
