//! Workspace role permission matrix
//!
//! Permissions are granted per workspace through the member's role:
//!
//! | permission | owner | admin | member | viewer |
//! |---|---|---|---|---|
//! | view_workspace, view_tasks, view_activity | ✓ | ✓ | ✓ | ✓ |
//! | add_tasks, edit_own_tasks, delete_own_tasks, add_comments, add_attachments | ✓ | ✓ | ✓ | |
//! | edit_workspace, invite_members, manage_members, manage_categories, edit_tasks, delete_tasks, moderate_comments | ✓ | ✓ | | |
//! | delete_workspace, transfer_ownership | ✓ | | | |

use std::collections::HashMap;

use tb_contracts::permissions::*;
use tb_contracts::UserContext;
use tb_core::Id;
use tb_models::WorkspaceRole;

const VIEWER: &[&str] = &[VIEW_WORKSPACE, VIEW_TASKS, VIEW_ACTIVITY];

const MEMBER: &[&str] = &[
    VIEW_WORKSPACE,
    VIEW_TASKS,
    VIEW_ACTIVITY,
    ADD_TASKS,
    EDIT_OWN_TASKS,
    DELETE_OWN_TASKS,
    ADD_COMMENTS,
    ADD_ATTACHMENTS,
];

const ADMIN: &[&str] = &[
    VIEW_WORKSPACE,
    VIEW_TASKS,
    VIEW_ACTIVITY,
    ADD_TASKS,
    EDIT_OWN_TASKS,
    DELETE_OWN_TASKS,
    ADD_COMMENTS,
    ADD_ATTACHMENTS,
    EDIT_WORKSPACE,
    INVITE_MEMBERS,
    MANAGE_MEMBERS,
    MANAGE_CATEGORIES,
    EDIT_TASKS,
    DELETE_TASKS,
    MODERATE_COMMENTS,
];

pub fn role_permissions(role: WorkspaceRole) -> &'static [&'static str] {
    match role {
        WorkspaceRole::Owner => ALL,
        WorkspaceRole::Admin => ADMIN,
        WorkspaceRole::Member => MEMBER,
        WorkspaceRole::Viewer => VIEWER,
    }
}

pub fn role_allows(role: WorkspaceRole, permission: &str) -> bool {
    role_permissions(role).iter().any(|p| *p == permission)
}

/// Authenticated user with their active workspace roles
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub name: String,
    pub email: String,
    roles: HashMap<Id, WorkspaceRole>,
}

impl CurrentUser {
    pub fn new(id: Id, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            roles: HashMap::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = (Id, WorkspaceRole)>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn add_role(&mut self, workspace_id: Id, role: WorkspaceRole) {
        self.roles.insert(workspace_id, role);
    }

    /// Workspaces the user is an active member of, ascending
    pub fn workspace_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.roles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl UserContext for CurrentUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn role_in_workspace(&self, workspace_id: Id) -> Option<WorkspaceRole> {
        self.roles.get(&workspace_id).copied()
    }

    fn allowed_in_workspace(&self, permission: &str, workspace_id: Id) -> bool {
        self.role_in_workspace(workspace_id)
            .is_some_and(|role| role_allows(role, permission))
    }
}
