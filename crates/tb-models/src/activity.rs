//! Activity log model: an audit trail of mutations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable};

use crate::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Assigned,
    Commented,
    AttachmentAdded,
    AttachmentRemoved,
    MemberInvited,
    MemberJoined,
    MemberDeclined,
    MemberRemoved,
    MemberLeft,
    RoleChanged,
    OwnershipTransferred,
}

text_enum!(ActivityAction {
    Created => "created",
    Updated => "updated",
    Deleted => "deleted",
    StatusChanged => "status_changed",
    Assigned => "assigned",
    Commented => "commented",
    AttachmentAdded => "attachment_added",
    AttachmentRemoved => "attachment_removed",
    MemberInvited => "member_invited",
    MemberJoined => "member_joined",
    MemberDeclined => "member_declined",
    MemberRemoved => "member_removed",
    MemberLeft => "member_left",
    RoleChanged => "role_changed",
    OwnershipTransferred => "ownership_transferred",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Workspace,
    Task,
    Subtask,
    Comment,
    Category,
    Attachment,
    Member,
}

text_enum!(EntityType {
    Workspace => "workspace",
    Task => "task",
    Subtask => "subtask",
    Comment => "comment",
    Category => "category",
    Attachment => "attachment",
    Member => "member",
});

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Id,
    pub user_id: Option<Id>,
    pub user_name: Option<String>,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Id,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for ActivityLog {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for ActivityLog {
    const TABLE_NAME: &'static str = "activity_logs";
    const TYPE_NAME: &'static str = "Activity";
}

/// An activity row about to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Id,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Id,
    pub details: serde_json::Value,
}

impl NewActivity {
    pub fn new(user_id: Id, action: ActivityAction, entity_type: EntityType, entity_id: Id) -> Self {
        Self {
            user_id,
            workspace_id: None,
            task_id: None,
            action,
            entity_type,
            entity_id,
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn in_workspace(mut self, workspace_id: Id) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    pub fn on_task(mut self, task_id: Id) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let activity = NewActivity::new(1, ActivityAction::StatusChanged, EntityType::Task, 9)
            .in_workspace(3)
            .on_task(9)
            .with_details(json!({"from": "todo", "to": "completed"}));

        assert_eq!(activity.workspace_id, Some(3));
        assert_eq!(activity.task_id, Some(9));
        assert_eq!(activity.details["to"], "completed");
        assert_eq!(activity.action.as_str(), "status_changed");
    }

    #[test]
    fn test_default_details_is_empty_object() {
        let activity = NewActivity::new(1, ActivityAction::Created, EntityType::Workspace, 1);
        assert_eq!(activity.details, json!({}));
    }
}
