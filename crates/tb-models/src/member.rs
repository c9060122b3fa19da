//! Workspace membership model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable, WorkspaceScoped};
use validator::Validate;

use crate::text_enum;

/// Role of a member inside a workspace, from most to least privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

text_enum!(WorkspaceRole {
    Owner => "owner",
    Admin => "admin",
    Member => "member",
    Viewer => "viewer",
});

impl WorkspaceRole {
    /// Higher is more privileged
    pub fn rank(&self) -> u8 {
        match self {
            WorkspaceRole::Owner => 3,
            WorkspaceRole::Admin => 2,
            WorkspaceRole::Member => 1,
            WorkspaceRole::Viewer => 0,
        }
    }

    pub fn outranks(&self, other: WorkspaceRole) -> bool {
        self.rank() > other.rank()
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, WorkspaceRole::Viewer)
    }
}

/// Membership lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Invited,
    Active,
    Declined,
}

text_enum!(MemberStatus {
    Invited => "invited",
    Active => "active",
    Declined => "declined",
});

impl MemberStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, MemberStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: Id,
    pub workspace_id: Id,
    pub user_id: Id,
    pub role: WorkspaceRole,
    pub status: MemberStatus,
    pub invited_by_id: Option<Id>,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceMember {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_owner(&self) -> bool {
        self.role == WorkspaceRole::Owner
    }
}

impl Identifiable for WorkspaceMember {
    fn id(&self) -> Id {
        self.id
    }
}

impl WorkspaceScoped for WorkspaceMember {
    fn workspace_id(&self) -> Id {
        self.workspace_id
    }
}

impl Entity for WorkspaceMember {
    const TABLE_NAME: &'static str = "workspace_members";
    const TYPE_NAME: &'static str = "Member";
}

/// Membership joined with the member's public profile
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithUser {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: WorkspaceMember,
    pub user_name: String,
    pub user_email: String,
    pub user_avatar_url: Option<String>,
}

/// A pending invitation as shown to the invitee
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub workspace_id: Id,
    pub workspace_name: String,
    pub role: WorkspaceRole,
    pub invited_by_id: Option<Id>,
    pub invited_by_name: Option<String>,
    pub invited_at: DateTime<Utc>,
}

/// POST /workspaces/:id/members
///
/// The invitee is named either by id or by email.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    pub user_id: Option<Id>,
    #[validate(email(message = "is not a valid email address"))]
    pub email: Option<String>,
    pub role: WorkspaceRole,
}

/// PATCH /workspaces/:id/members/:user_id
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: WorkspaceRole,
}

/// POST /workspaces/:id/transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipRequest {
    pub user_id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(WorkspaceRole::Owner.outranks(WorkspaceRole::Admin));
        assert!(WorkspaceRole::Admin.outranks(WorkspaceRole::Member));
        assert!(WorkspaceRole::Member.outranks(WorkspaceRole::Viewer));
        assert!(!WorkspaceRole::Admin.outranks(WorkspaceRole::Admin));
        assert!(WorkspaceRole::Viewer.is_read_only());
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(WorkspaceRole::Admin.as_str(), "admin");
        assert_eq!("viewer".parse::<WorkspaceRole>(), Ok(WorkspaceRole::Viewer));
        let err = "superuser".parse::<WorkspaceRole>().unwrap_err();
        assert_eq!(err.to_string(), "'superuser' is not a valid WorkspaceRole");
        assert_eq!(WorkspaceRole::ALL.len(), 4);
    }

    #[test]
    fn test_role_serde_matches_storage_text() {
        for role in WorkspaceRole::ALL {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, role.as_str());
        }
        for status in MemberStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
    }

    #[test]
    fn test_invite_request_deserialize() {
        let req: InviteMemberRequest =
            serde_json::from_str(r#"{"email":"a@example.com","role":"member"}"#).unwrap();
        assert_eq!(req.role, WorkspaceRole::Member);
        assert_eq!(req.user_id, None);
        assert!(req.validate().is_ok());
    }
}
