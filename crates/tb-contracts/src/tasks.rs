//! Task guards and contracts

use chrono::{DateTime, Utc};
use tb_core::{Id, TbResult, ValidationErrors};
use tb_models::{Category, CreateTaskRequest, MemberStatus, Task, WorkspaceMember, WorkspaceRole};

use crate::base::{
    authorize, validate_max_length, validate_required_text, Contract, UserContext,
    ValidationResult,
};
use crate::permissions;

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 10_000;

/// Task attributes checked by [`TaskContract`]
pub trait TaskData: Send + Sync {
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn start_date(&self) -> Option<DateTime<Utc>>;
    fn due_date(&self) -> Option<DateTime<Utc>>;
}

impl TaskData for Task {
    fn title(&self) -> &str {
        &self.title
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }
    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }
}

impl TaskData for CreateTaskRequest {
    fn title(&self) -> &str {
        &self.title
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }
    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }
}

pub struct TaskContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> TaskContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    pub fn view(&self, task: &Task) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::VIEW_TASKS, task.workspace_id),
            "You cannot view tasks in this workspace",
        )
    }

    pub fn create(&self, workspace_id: Id) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::ADD_TASKS, workspace_id),
            "You cannot add tasks to this workspace",
        )
    }

    /// Editors may change any task; members only tasks they created or are assigned
    pub fn update(&self, task: &Task) -> TbResult<()> {
        let user_id = self.user.user_id();
        let ws = task.workspace_id;
        let allowed = self.user.allowed_in_workspace(permissions::EDIT_TASKS, ws)
            || (self.user.allowed_in_workspace(permissions::EDIT_OWN_TASKS, ws)
                && (task.is_created_by(user_id) || task.is_assigned_to(user_id)));
        authorize(allowed, "You are not allowed to edit this task")
    }

    pub fn delete(&self, task: &Task) -> TbResult<()> {
        let ws = task.workspace_id;
        let allowed = self.user.allowed_in_workspace(permissions::DELETE_TASKS, ws)
            || (self.user.allowed_in_workspace(permissions::DELETE_OWN_TASKS, ws)
                && task.is_created_by(self.user.user_id()));
        authorize(allowed, "You are not allowed to delete this task")
    }

    /// `membership` is the assignee's row in the task's workspace, if any
    pub fn validate_assignee(
        &self,
        workspace_id: Id,
        membership: Option<&WorkspaceMember>,
    ) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        match membership {
            Some(m)
                if m.workspace_id == workspace_id && m.status == MemberStatus::Active =>
            {
                if m.role == WorkspaceRole::Viewer {
                    errors.add("assigneeId", "cannot be a viewer");
                }
            }
            _ => errors.add("assigneeId", "must be an active member of the workspace"),
        }
        errors.into_result()
    }

    pub fn validate_category(&self, workspace_id: Id, category: Option<&Category>) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if !category.is_some_and(|c| c.workspace_id == workspace_id) {
            errors.add("categoryId", "must belong to the same workspace");
        }
        errors.into_result()
    }
}

impl<U: UserContext, T: TaskData> Contract<T> for TaskContract<'_, U> {
    fn validate(&self, task: &T) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_required_text(&mut errors, "title", task.title(), TITLE_MAX);
        if let Some(description) = task.description() {
            validate_max_length(&mut errors, "description", description, DESCRIPTION_MAX);
        }
        if let (Some(start), Some(due)) = (task.start_date(), task.due_date()) {
            if start > due {
                errors.add("startDate", "must be on or before the due date");
            }
        }

        errors.into_result()
    }
}
