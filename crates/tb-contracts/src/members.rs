//! Membership guards
//!
//! Roles are strictly ordered (`owner > admin > member > viewer`). Managing
//! another member requires outranking them, with the owner untouchable
//! except through an ownership transfer.

use tb_core::{TbError, TbResult};
use tb_models::{MemberStatus, Workspace, WorkspaceMember, WorkspaceRole};

use crate::base::{authorize, UserContext};
use crate::permissions;

pub struct MemberContract<'a, U: UserContext> {
    user: &'a U,
    workspace: &'a Workspace,
}

impl<'a, U: UserContext> MemberContract<'a, U> {
    pub fn new(user: &'a U, workspace: &'a Workspace) -> Self {
        Self { user, workspace }
    }

    fn actor_role(&self) -> Option<WorkspaceRole> {
        self.user.role_in_workspace(self.workspace.id)
    }

    fn allowed(&self, permission: &str) -> bool {
        self.user.allowed_in_workspace(permission, self.workspace.id)
    }

    fn not_personal(&self) -> TbResult<()> {
        authorize(
            !self.workspace.is_personal,
            "Personal workspaces cannot be shared",
        )
    }

    pub fn list(&self) -> TbResult<()> {
        authorize(
            self.allowed(permissions::VIEW_WORKSPACE),
            "You are not a member of this workspace",
        )
    }

    /// Owners may invite any non-owner role, everybody else only roles below their own
    pub fn invite(&self, role: WorkspaceRole) -> TbResult<()> {
        self.not_personal()?;
        authorize(
            self.allowed(permissions::INVITE_MEMBERS),
            "You are not allowed to invite members",
        )?;
        if role == WorkspaceRole::Owner {
            return Err(TbError::invalid("role", "cannot be owner"));
        }
        let allowed = match self.actor_role() {
            Some(WorkspaceRole::Owner) => true,
            Some(actor) => actor.outranks(role),
            None => false,
        };
        authorize(
            allowed,
            &format!("You cannot invite members as {role}"),
        )
    }

    pub fn change_role(&self, target: &WorkspaceMember, new_role: WorkspaceRole) -> TbResult<()> {
        authorize(
            self.allowed(permissions::MANAGE_MEMBERS),
            "You are not allowed to manage members",
        )?;
        authorize(
            target.user_id != self.user.user_id(),
            "You cannot change your own role",
        )?;
        authorize(
            !target.is_owner(),
            "The owner's role can only change through an ownership transfer",
        )?;
        if new_role == WorkspaceRole::Owner {
            return Err(TbError::invalid("role", "cannot be owner"));
        }
        let actor = self.actor_role();
        authorize(
            actor.is_some_and(|a| a.outranks(target.role) && a.outranks(new_role)),
            "You can only manage members below your own role",
        )
    }

    pub fn remove(&self, target: &WorkspaceMember) -> TbResult<()> {
        authorize(
            self.allowed(permissions::MANAGE_MEMBERS),
            "You are not allowed to manage members",
        )?;
        authorize(
            target.user_id != self.user.user_id(),
            "Use leave to remove yourself from a workspace",
        )?;
        authorize(!target.is_owner(), "The owner cannot be removed")?;
        authorize(
            self.actor_role().is_some_and(|a| a.outranks(target.role)),
            "You can only manage members below your own role",
        )
    }

    pub fn leave(&self, membership: &WorkspaceMember) -> TbResult<()> {
        authorize(
            !self.workspace.is_personal,
            "You cannot leave your personal workspace",
        )?;
        authorize(
            !membership.is_owner(),
            "Transfer ownership before leaving the workspace",
        )?;
        if !membership.is_active() {
            return Err(TbError::conflict("You are not an active member of this workspace"));
        }
        Ok(())
    }

    /// Only the invited user answers an invitation, and only once
    pub fn respond_to_invitation(&self, membership: &WorkspaceMember) -> TbResult<()> {
        if membership.user_id != self.user.user_id() {
            return Err(TbError::not_found("Invitation", self.workspace.id));
        }
        if membership.status != MemberStatus::Invited {
            return Err(TbError::conflict("This invitation is no longer pending"));
        }
        Ok(())
    }

    pub fn transfer_ownership(&self, target: &WorkspaceMember) -> TbResult<()> {
        self.not_personal()?;
        authorize(
            self.allowed(permissions::TRANSFER_OWNERSHIP),
            "Only the owner can transfer ownership",
        )?;
        if target.user_id == self.user.user_id() {
            return Err(TbError::invalid("userId", "is already the owner"));
        }
        if !target.is_active() {
            return Err(TbError::invalid("userId", "must be an active member"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{member, workspace, MockUser};
    use MemberStatus::*;
    use WorkspaceRole::*;

    #[test]
    fn test_invite_role_rules() {
        let ws = workspace(1, 1, false);
        let owner = MockUser::new(1).with_role(1, Owner);
        let admin = MockUser::new(2).with_role(1, Admin);
        let plain = MockUser::new(3).with_role(1, Member);

        let c = MemberContract::new(&owner, &ws);
        assert!(c.invite(Admin).is_ok());
        assert!(c.invite(Viewer).is_ok());
        assert_eq!(c.invite(Owner).unwrap_err().status_code(), 422);

        let c = MemberContract::new(&admin, &ws);
        assert!(c.invite(Member).is_ok());
        assert!(c.invite(Viewer).is_ok());
        assert_eq!(c.invite(Admin).unwrap_err().status_code(), 403);

        assert!(MemberContract::new(&plain, &ws).invite(Viewer).is_err());
    }

    #[test]
    fn test_cannot_invite_into_personal_workspace() {
        let ws = workspace(1, 1, true);
        let owner = MockUser::new(1).with_role(1, Owner);
        assert!(MemberContract::new(&owner, &ws).invite(Member).is_err());
    }

    #[test]
    fn test_change_role() {
        let ws = workspace(1, 1, false);
        let owner = MockUser::new(1).with_role(1, Owner);
        let admin = MockUser::new(2).with_role(1, Admin);

        let viewer = member(1, 4, Viewer, Active);
        let other_admin = member(1, 5, Admin, Active);
        let the_owner = member(1, 1, Owner, Active);
        let me = member(1, 2, Admin, Active);

        let by_owner = MemberContract::new(&owner, &ws);
        assert!(by_owner.change_role(&viewer, Admin).is_ok());
        assert!(by_owner.change_role(&other_admin, Member).is_ok());
        assert!(by_owner.change_role(&viewer, Owner).is_err());

        let by_admin = MemberContract::new(&admin, &ws);
        assert!(by_admin.change_role(&viewer, Member).is_ok());
        assert!(by_admin.change_role(&viewer, Admin).is_err());
        assert!(by_admin.change_role(&other_admin, Member).is_err());
        assert!(by_admin.change_role(&the_owner, Member).is_err());
        assert!(by_admin.change_role(&me, Member).is_err());
    }

    #[test]
    fn test_remove() {
        let ws = workspace(1, 1, false);
        let admin = MockUser::new(2).with_role(1, Admin);
        let c = MemberContract::new(&admin, &ws);

        assert!(c.remove(&member(1, 4, Member, Active)).is_ok());
        assert!(c.remove(&member(1, 4, Viewer, Invited)).is_ok());
        assert!(c.remove(&member(1, 5, Admin, Active)).is_err());
        assert!(c.remove(&member(1, 1, Owner, Active)).is_err());
        assert!(c.remove(&member(1, 2, Admin, Active)).is_err());
    }

    #[test]
    fn test_leave() {
        let shared = workspace(1, 1, false);
        let personal = workspace(2, 3, true);
        let user = MockUser::new(3).with_role(1, Member).with_role(2, Owner);

        assert!(MemberContract::new(&user, &shared)
            .leave(&member(1, 3, Member, Active))
            .is_ok());
        assert!(MemberContract::new(&user, &shared)
            .leave(&member(1, 3, Owner, Active))
            .is_err());
        assert!(MemberContract::new(&user, &personal)
            .leave(&member(2, 3, Owner, Active))
            .is_err());
    }

    #[test]
    fn test_respond_to_invitation() {
        let ws = workspace(1, 1, false);
        let invitee = MockUser::new(7);
        let c = MemberContract::new(&invitee, &ws);

        assert!(c.respond_to_invitation(&member(1, 7, Member, Invited)).is_ok());
        assert_eq!(
            c.respond_to_invitation(&member(1, 7, Member, Active))
                .unwrap_err()
                .status_code(),
            409
        );
        assert_eq!(
            c.respond_to_invitation(&member(1, 8, Member, Invited))
                .unwrap_err()
                .status_code(),
            404
        );
    }

    #[test]
    fn test_transfer_ownership() {
        let ws = workspace(1, 1, false);
        let owner = MockUser::new(1).with_role(1, Owner);
        let admin = MockUser::new(2).with_role(1, Admin);

        let c = MemberContract::new(&owner, &ws);
        assert!(c.transfer_ownership(&member(1, 2, Admin, Active)).is_ok());
        assert!(c.transfer_ownership(&member(1, 3, Member, Invited)).is_err());
        assert!(c.transfer_ownership(&member(1, 1, Owner, Active)).is_err());

        assert!(MemberContract::new(&admin, &ws)
            .transfer_ownership(&member(1, 3, Member, Active))
            .is_err());
    }
}
