//! Task model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable, Timestamped, WorkspaceScoped};
use validator::Validate;

use crate::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Completed,
}

text_enum!(TaskStatus {
    Todo => "todo",
    InProgress => "in_progress",
    InReview => "in_review",
    Completed => "completed",
});

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

impl TaskPriority {
    /// Sort weight, higher is more urgent
    pub fn weight(&self) -> i32 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
            TaskPriority::Urgent => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Id,
    pub workspace_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub category_id: Option<Id>,
    pub creator_id: Id,
    pub assignee_id: Option<Id>,
    #[serde(skip_serializing)]
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_done() && self.due_date.is_some_and(|due| due < now)
    }

    pub fn is_assigned_to(&self, user_id: Id) -> bool {
        self.assignee_id == Some(user_id)
    }

    pub fn is_created_by(&self, user_id: Id) -> bool {
        self.creator_id == user_id
    }
}

impl Identifiable for Task {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Task {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl WorkspaceScoped for Task {
    fn workspace_id(&self) -> Id {
        self.workspace_id
    }
}

impl Entity for Task {
    const TABLE_NAME: &'static str = "tasks";
    const TYPE_NAME: &'static str = "Task";
}

/// DTO for inserting a task
#[derive(Debug, Clone)]
pub struct CreateTaskDto {
    pub workspace_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<Id>,
    pub creator_id: Id,
    pub assignee_id: Option<Id>,
}

/// DTO for a partial task update; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTaskDto {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub category_id: Option<Option<Id>>,
    pub assignee_id: Option<Option<Id>>,
    /// Clear `reminder_sent_at` so a moved due date is reminded again
    pub reset_reminder: bool,
}

impl UpdateTaskDto {
    pub fn is_empty(&self) -> bool {
        *self == UpdateTaskDto::default()
    }
}

/// Open task due soon, joined with the assignee it should remind
#[derive(Debug, Clone, FromRow)]
pub struct DueTaskReminder {
    pub task_id: Id,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub workspace_id: Id,
    pub workspace_name: String,
    pub assignee_id: Id,
    pub assignee_name: String,
    pub assignee_email: String,
    pub email_notifications: bool,
}

/// POST /tasks
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub workspace_id: Id,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 10000, message = "is too long (maximum is 10000 characters)"))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<Id>,
    pub assignee_id: Option<Id>,
}

/// PATCH /tasks/:id
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub category_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub assignee_id: Option<Option<Id>>,
}

/// PUT /tasks/:id/assignee
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub assignee_id: Option<Id>,
}

/// PUT /tasks/:id/status
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TaskStatus,
}
