//! Permission names checked by guards
//!
//! Which roles hold which permission is decided in `tb-auth`.

pub const VIEW_WORKSPACE: &str = "view_workspace";
pub const EDIT_WORKSPACE: &str = "edit_workspace";
pub const DELETE_WORKSPACE: &str = "delete_workspace";
pub const TRANSFER_OWNERSHIP: &str = "transfer_ownership";

pub const INVITE_MEMBERS: &str = "invite_members";
pub const MANAGE_MEMBERS: &str = "manage_members";

pub const MANAGE_CATEGORIES: &str = "manage_categories";

pub const VIEW_TASKS: &str = "view_tasks";
pub const ADD_TASKS: &str = "add_tasks";
pub const EDIT_TASKS: &str = "edit_tasks";
pub const EDIT_OWN_TASKS: &str = "edit_own_tasks";
pub const DELETE_TASKS: &str = "delete_tasks";
pub const DELETE_OWN_TASKS: &str = "delete_own_tasks";

pub const ADD_COMMENTS: &str = "add_comments";
pub const MODERATE_COMMENTS: &str = "moderate_comments";

pub const ADD_ATTACHMENTS: &str = "add_attachments";

pub const VIEW_ACTIVITY: &str = "view_activity";

pub const ALL: &[&str] = &[
    VIEW_WORKSPACE,
    EDIT_WORKSPACE,
    DELETE_WORKSPACE,
    TRANSFER_OWNERSHIP,
    INVITE_MEMBERS,
    MANAGE_MEMBERS,
    MANAGE_CATEGORIES,
    VIEW_TASKS,
    ADD_TASKS,
    EDIT_TASKS,
    EDIT_OWN_TASKS,
    DELETE_TASKS,
    DELETE_OWN_TASKS,
    ADD_COMMENTS,
    MODERATE_COMMENTS,
    ADD_ATTACHMENTS,
    VIEW_ACTIVITY,
];
