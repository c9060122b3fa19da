use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tb_core::Id;
use tb_models::{
    MemberStatus, Task, TaskPriority, TaskStatus, Workspace, WorkspaceMember, WorkspaceRole,
};

use crate::base::UserContext;
use crate::permissions::*;

pub struct MockUser {
    pub id: Id,
    roles: HashMap<Id, WorkspaceRole>,
    permissions: HashSet<(String, Id)>,
}

impl MockUser {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            roles: HashMap::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_role(mut self, workspace_id: Id, role: WorkspaceRole) -> Self {
        self.roles.insert(workspace_id, role);
        for permission in role_permissions(role) {
            self.permissions.insert((permission.to_string(), workspace_id));
        }
        self
    }
}

impl UserContext for MockUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn role_in_workspace(&self, workspace_id: Id) -> Option<WorkspaceRole> {
        self.roles.get(&workspace_id).copied()
    }

    fn allowed_in_workspace(&self, permission: &str, workspace_id: Id) -> bool {
        self.permissions
            .contains(&(permission.to_string(), workspace_id))
    }
}

fn role_permissions(role: WorkspaceRole) -> Vec<&'static str> {
    let mut perms = vec![VIEW_WORKSPACE, VIEW_TASKS, VIEW_ACTIVITY];
    if role != WorkspaceRole::Viewer {
        perms.extend([
            ADD_TASKS,
            EDIT_OWN_TASKS,
            DELETE_OWN_TASKS,
            ADD_COMMENTS,
            ADD_ATTACHMENTS,
        ]);
    }
    if matches!(role, WorkspaceRole::Owner | WorkspaceRole::Admin) {
        perms.extend([
            EDIT_WORKSPACE,
            INVITE_MEMBERS,
            MANAGE_MEMBERS,
            MANAGE_CATEGORIES,
            EDIT_TASKS,
            DELETE_TASKS,
            MODERATE_COMMENTS,
        ]);
    }
    if role == WorkspaceRole::Owner {
        perms.extend([DELETE_WORKSPACE, TRANSFER_OWNERSHIP]);
    }
    perms
}

pub fn workspace(id: Id, owner_id: Id, is_personal: bool) -> Workspace {
    Workspace {
        id,
        name: "Team".into(),
        description: None,
        is_personal,
        owner_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn member(workspace_id: Id, user_id: Id, role: WorkspaceRole, status: MemberStatus) -> WorkspaceMember {
    WorkspaceMember {
        id: user_id * 100 + workspace_id,
        workspace_id,
        user_id,
        role,
        status,
        invited_by_id: None,
        joined_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn task(workspace_id: Id, creator_id: Id, assignee_id: Option<Id>) -> Task {
    Task {
        id: 42,
        workspace_id,
        title: "Ship it".into(),
        description: None,
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        start_date: None,
        due_date: None,
        completed_at: None,
        category_id: None,
        creator_id,
        assignee_id,
        reminder_sent_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
