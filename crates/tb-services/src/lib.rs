//! # tb-services
//!
//! Business logic services for Taskboard.
//!
//! Every write follows the same steps: load what the caller may see,
//! authorize through the contracts, validate, persist, then record activity
//! and notify. Activity and notification failures are logged and never fail
//! the operation.

pub mod activity;
pub mod attachments;
pub mod auth;
mod base;
pub mod categories;
pub mod comments;
pub mod container;
pub mod members;
pub mod subtasks;
pub mod tasks;
pub mod users;
pub mod workspaces;

#[cfg(test)]
pub(crate) mod test_support;

pub use activity::ActivityService;
pub use attachments::{AttachmentService, Upload};
pub use auth::{AuthService, AuthSession, PERSONAL_WORKSPACE_NAME};
pub use categories::CategoryService;
pub use comments::CommentService;
pub use container::{Services, Stores};
pub use members::MemberService;
pub use subtasks::SubTaskService;
pub use tasks::TaskService;
pub use users::UserService;
pub use workspaces::WorkspaceService;
