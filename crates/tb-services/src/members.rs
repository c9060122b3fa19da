//! Workspace membership: invitations, roles and ownership

use std::sync::Arc;

use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{MemberContract, UserContext};
use tb_core::{Id, TbError, TbResult};
use tb_db::{MemberStore, UserStore, WorkspaceStore};
use tb_models::{
    ActivityAction, EntityType, InviteMemberRequest, Invitation, MemberStatus, MemberWithUser,
    NewActivity, NotificationKind, TransferOwnershipRequest, UpdateMemberRoleRequest, User,
    Workspace, WorkspaceMember,
};
use tb_notifications::{NotificationEvent, NotificationService};
use tracing::info;

use crate::activity::ActivityService;
use crate::base::{found, validate_request};

pub struct MemberService {
    workspaces: Arc<dyn WorkspaceStore>,
    members: Arc<dyn MemberStore>,
    users: Arc<dyn UserStore>,
    activity: Arc<ActivityService>,
    notifications: Arc<NotificationService>,
}

impl MemberService {
    pub fn new(
        workspaces: Arc<dyn WorkspaceStore>,
        members: Arc<dyn MemberStore>,
        users: Arc<dyn UserStore>,
        activity: Arc<ActivityService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            workspaces,
            members,
            users,
            activity,
            notifications,
        }
    }

    async fn workspace(&self, id: Id) -> TbResult<Workspace> {
        found(self.workspaces.find_by_id(id).await?, "Workspace", id)
    }

    async fn member_workspace(&self, user: &CurrentUser, id: Id) -> TbResult<Workspace> {
        if !user.is_member_of(id) {
            return Err(TbError::not_found("Workspace", id));
        }
        self.workspace(id).await
    }

    async fn membership(&self, workspace_id: Id, user_id: Id) -> TbResult<WorkspaceMember> {
        found(
            self.members.find(workspace_id, user_id).await?,
            "Member",
            user_id,
        )
    }

    async fn record(
        &self,
        user: &CurrentUser,
        action: ActivityAction,
        member: &WorkspaceMember,
        details: serde_json::Value,
    ) {
        self.activity
            .record(
                NewActivity::new(user.id, action, EntityType::Member, member.id)
                    .in_workspace(member.workspace_id)
                    .with_details(details),
            )
            .await;
    }

    pub async fn list(&self, user: &CurrentUser, workspace_id: Id) -> TbResult<Vec<MemberWithUser>> {
        let workspace = self.member_workspace(user, workspace_id).await?;
        MemberContract::new(user, &workspace).list()?;
        Ok(self.members.list_by_workspace(workspace.id).await?)
    }

    async fn resolve_invitee(&self, request: &InviteMemberRequest) -> TbResult<User> {
        match (request.user_id, request.email.as_deref()) {
            (Some(id), _) => found(self.users.find_by_id(id).await?, "User", id),
            (None, Some(email)) => {
                let email = email.trim().to_lowercase();
                self.users
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| TbError::NotFound {
                        entity: "User",
                        field: "email",
                        value: email,
                    })
            }
            (None, None) => Err(TbError::invalid("userId", "or email must be given")),
        }
    }

    pub async fn invite(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        request: InviteMemberRequest,
    ) -> TbResult<WorkspaceMember> {
        validate_request(&request)?;
        let workspace = self.member_workspace(user, workspace_id).await?;
        MemberContract::new(user, &workspace).invite(request.role)?;

        let invitee = self.resolve_invitee(&request).await?;
        if invitee.id == user.id {
            return Err(TbError::invalid("userId", "cannot invite yourself"));
        }

        let member = self
            .members
            .invite(workspace.id, invitee.id, request.role, user.id)
            .await?;
        info!(workspace_id = workspace.id, invitee_id = invitee.id, role = %request.role, "Member invited");

        self.record(
            user,
            ActivityAction::MemberInvited,
            &member,
            json!({ "userId": invitee.id, "role": request.role }),
        )
        .await;
        self.notifications
            .notify(
                NotificationEvent::new(
                    NotificationKind::WorkspaceInvitation,
                    format!("Invitation to {}", workspace.name),
                    format!(
                        "{} invited you to join {} as {}",
                        user.name, workspace.name, request.role
                    ),
                )
                .by(user.id)
                .to(invitee.id)
                .in_workspace(workspace.id),
            )
            .await;
        Ok(member)
    }

    async fn respond(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        accept: bool,
    ) -> TbResult<WorkspaceMember> {
        let workspace = self.workspace(workspace_id).await?;
        let invitation = self
            .members
            .find(workspace.id, user.id)
            .await?
            .ok_or_else(|| TbError::not_found("Invitation", workspace.id))?;
        MemberContract::new(user, &workspace).respond_to_invitation(&invitation)?;

        let (status, action) = if accept {
            (MemberStatus::Active, ActivityAction::MemberJoined)
        } else {
            (MemberStatus::Declined, ActivityAction::MemberDeclined)
        };
        let member = self.members.set_status(invitation.id, status).await?;
        self.record(user, action, &member, json!({ "role": member.role }))
            .await;

        if accept {
            if let Some(inviter) = member.invited_by_id {
                self.notifications
                    .notify(
                        NotificationEvent::new(
                            NotificationKind::InvitationAccepted,
                            format!("{} joined {}", user.name, workspace.name),
                            format!("{} accepted your invitation to {}", user.name, workspace.name),
                        )
                        .by(user.id)
                        .to(inviter)
                        .in_workspace(workspace.id),
                    )
                    .await;
            }
        }
        Ok(member)
    }

    pub async fn accept(&self, user: &CurrentUser, workspace_id: Id) -> TbResult<WorkspaceMember> {
        self.respond(user, workspace_id, true).await
    }

    pub async fn decline(&self, user: &CurrentUser, workspace_id: Id) -> TbResult<WorkspaceMember> {
        self.respond(user, workspace_id, false).await
    }

    pub async fn my_invitations(&self, user: &CurrentUser) -> TbResult<Vec<Invitation>> {
        Ok(self.members.pending_invitations(user.id).await?)
    }

    pub async fn change_role(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        target_user_id: Id,
        request: UpdateMemberRoleRequest,
    ) -> TbResult<WorkspaceMember> {
        let workspace = self.member_workspace(user, workspace_id).await?;
        let target = self.membership(workspace.id, target_user_id).await?;
        MemberContract::new(user, &workspace).change_role(&target, request.role)?;

        if target.role == request.role {
            return Ok(target);
        }
        let member = self.members.set_role(target.id, request.role).await?;
        self.record(
            user,
            ActivityAction::RoleChanged,
            &member,
            json!({ "userId": member.user_id, "from": target.role, "to": member.role }),
        )
        .await;
        if member.is_active() {
            self.notifications
                .notify(
                    NotificationEvent::new(
                        NotificationKind::MemberRoleChanged,
                        format!("Your role in {} changed", workspace.name),
                        format!("You are now {} in {}", member.role, workspace.name),
                    )
                    .by(user.id)
                    .to(member.user_id)
                    .in_workspace(workspace.id),
                )
                .await;
        }
        Ok(member)
    }

    pub async fn remove(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        target_user_id: Id,
    ) -> TbResult<()> {
        let workspace = self.member_workspace(user, workspace_id).await?;
        let target = self.membership(workspace.id, target_user_id).await?;
        MemberContract::new(user, &workspace).remove(&target)?;

        self.members.delete(target.id).await?;
        info!(workspace_id = workspace.id, user_id = target.user_id, "Member removed");
        self.record(
            user,
            ActivityAction::MemberRemoved,
            &target,
            json!({ "userId": target.user_id }),
        )
        .await;

        if target.is_active() {
            self.notifications
                .notify(
                    NotificationEvent::new(
                        NotificationKind::MemberRemoved,
                        format!("Removed from {}", workspace.name),
                        format!("{} removed you from {}", user.name, workspace.name),
                    )
                    .by(user.id)
                    .to(target.user_id)
                    .in_workspace(workspace.id),
                )
                .await;
        }
        Ok(())
    }

    pub async fn leave(&self, user: &CurrentUser, workspace_id: Id) -> TbResult<()> {
        let workspace = self.member_workspace(user, workspace_id).await?;
        let membership = self.membership(workspace.id, user.id).await?;
        MemberContract::new(user, &workspace).leave(&membership)?;

        self.members.delete(membership.id).await?;
        self.record(user, ActivityAction::MemberLeft, &membership, json!({}))
            .await;
        Ok(())
    }

    pub async fn transfer_ownership(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        request: TransferOwnershipRequest,
    ) -> TbResult<Workspace> {
        let workspace = self.member_workspace(user, workspace_id).await?;
        let target = self
            .members
            .find(workspace.id, request.user_id)
            .await?
            .ok_or_else(|| TbError::invalid("userId", "must be an active member"))?;
        MemberContract::new(user, &workspace).transfer_ownership(&target)?;

        let updated = self
            .workspaces
            .transfer_ownership(workspace.id, workspace.owner_id, target.user_id)
            .await?;
        info!(
            workspace_id = workspace.id,
            from = workspace.owner_id,
            to = target.user_id,
            "Ownership transferred"
        );
        self.record(
            user,
            ActivityAction::OwnershipTransferred,
            &target,
            json!({ "from": workspace.owner_id, "to": target.user_id }),
        )
        .await;
        self.notifications
            .notify(
                NotificationEvent::new(
                    NotificationKind::MemberRoleChanged,
                    format!("You now own {}", workspace.name),
                    format!("{} transferred ownership of {} to you", user.name, workspace.name),
                )
                .by(user.id)
                .to(target.user_id)
                .in_workspace(workspace.id),
            )
            .await;
        Ok(updated)
    }
}
