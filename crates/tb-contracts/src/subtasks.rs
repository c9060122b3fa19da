//! SubTask guards and contracts

use tb_core::{TbResult, ValidationErrors};
use tb_models::{CreateSubTaskRequest, Task, UpdateSubTaskRequest};

use crate::base::{authorize, validate_required_text, Contract, UserContext, ValidationResult};
use crate::tasks::{TaskContract, TITLE_MAX};

/// Subtasks follow the permissions of their parent task
pub struct SubTaskContract<'a, U: UserContext> {
    user: &'a U,
    tasks: TaskContract<'a, U>,
}

impl<'a, U: UserContext> SubTaskContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self {
            user,
            tasks: TaskContract::new(user),
        }
    }

    pub fn view(&self, parent: &Task) -> TbResult<()> {
        self.tasks.view(parent)
    }

    pub fn manage(&self, parent: &Task) -> TbResult<()> {
        self.tasks.update(parent)
    }

    /// The parent's assignee may tick items off even without edit rights
    pub fn toggle(&self, parent: &Task) -> TbResult<()> {
        if parent.is_assigned_to(self.user.user_id()) {
            return self.tasks.view(parent);
        }
        authorize(
            self.tasks.update(parent).is_ok(),
            "You are not allowed to update this subtask",
        )
    }
}

impl<U: UserContext> Contract<CreateSubTaskRequest> for SubTaskContract<'_, U> {
    fn validate(&self, request: &CreateSubTaskRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "title", &request.title, TITLE_MAX);
        errors.into_result()
    }
}

impl<U: UserContext> Contract<UpdateSubTaskRequest> for SubTaskContract<'_, U> {
    fn validate(&self, request: &UpdateSubTaskRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &request.title {
            validate_required_text(&mut errors, "title", title, TITLE_MAX);
        }
        if request.position.is_some_and(|p| p < 0) {
            errors.add("position", "must be zero or greater");
        }
        errors.into_result()
    }
}
