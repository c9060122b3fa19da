//! SubTask model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable};
use validator::Validate;

/// A checklist item inside a task
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: Id,
    pub task_id: Id,
    pub title: String,
    pub is_completed: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for SubTask {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for SubTask {
    const TABLE_NAME: &'static str = "subtasks";
    const TYPE_NAME: &'static str = "SubTask";
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubTaskDto {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub position: Option<i32>,
}

/// POST /tasks/:id/subtasks
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubTaskRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
}

/// PATCH /subtasks/:id
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubTaskRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    #[validate(range(min = 0, message = "must be zero or greater"))]
    pub position: Option<i32>,
}

impl UpdateSubTaskRequest {
    /// True when only the completion flag is being changed
    pub fn is_toggle_only(&self) -> bool {
        self.title.is_none() && self.position.is_none() && self.is_completed.is_some()
    }
}

impl From<UpdateSubTaskRequest> for UpdateSubTaskDto {
    fn from(req: UpdateSubTaskRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            is_completed: req.is_completed,
            position: req.position,
        }
    }
}
