//! API request handlers, one module per resource

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod invitations;
pub mod members;
pub mod notifications;
pub mod subtasks;
pub mod tasks;
pub mod users;
pub mod workspaces;
