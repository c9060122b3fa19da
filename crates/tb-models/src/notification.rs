//! In-app notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable};

use crate::text_enum;

/// What happened that the recipient is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskUpdated,
    TaskCommented,
    TaskDueSoon,
    WorkspaceInvitation,
    InvitationAccepted,
    MemberRoleChanged,
    MemberRemoved,
}

text_enum!(NotificationKind {
    TaskAssigned => "task_assigned",
    TaskUpdated => "task_updated",
    TaskCommented => "task_commented",
    TaskDueSoon => "task_due_soon",
    WorkspaceInvitation => "workspace_invitation",
    InvitationAccepted => "invitation_accepted",
    MemberRoleChanged => "member_role_changed",
    MemberRemoved => "member_removed",
});

impl NotificationKind {
    /// Kinds that are also delivered by email
    pub fn sends_email(&self) -> bool {
        matches!(
            self,
            NotificationKind::TaskAssigned
                | NotificationKind::TaskDueSoon
                | NotificationKind::WorkspaceInvitation
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    pub user_id: Id,
    pub actor_id: Option<Id>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(at);
        }
    }
}

impl Identifiable for Notification {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Notification {
    const TABLE_NAME: &'static str = "notifications";
    const TYPE_NAME: &'static str = "Notification";
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Id,
    pub actor_id: Option<Id>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_read_keeps_first_timestamp() {
        let created = Utc::now();
        let mut n = Notification {
            id: 1,
            user_id: 2,
            actor_id: None,
            kind: NotificationKind::TaskCommented,
            title: "New comment".into(),
            message: "Ada commented".into(),
            workspace_id: None,
            task_id: Some(3),
            is_read: false,
            read_at: None,
            created_at: created,
        };
        let first = created + chrono::Duration::minutes(1);
        n.mark_read(first);
        n.mark_read(first + chrono::Duration::minutes(5));
        assert!(n.is_read);
        assert_eq!(n.read_at, Some(first));
    }

    #[test]
    fn test_email_kinds() {
        assert!(NotificationKind::TaskAssigned.sends_email());
        assert!(NotificationKind::TaskDueSoon.sends_email());
        assert!(!NotificationKind::TaskCommented.sends_email());
    }
}
