//! # tb-contracts
//!
//! Permission guards and attribute validation for Taskboard.
//!
//! Every mutation runs two kinds of checks before it reaches the database:
//! guards, which decide whether the acting user may perform the operation at
//! all and fail with [`TbError::Forbidden`](tb_core::TbError), and contracts,
//! which collect attribute problems into [`ValidationErrors`](tb_core::ValidationErrors).

pub mod activity;
pub mod attachments;
pub mod base;
pub mod categories;
pub mod comments;
pub mod members;
pub mod notifications;
pub mod permissions;
pub mod subtasks;
pub mod tasks;
pub mod users;
pub mod workspaces;

#[cfg(test)]
pub(crate) mod test_support;

pub use activity::ActivityContract;
pub use attachments::AttachmentContract;
pub use base::{authorize, Contract, UserContext, ValidationResult};
pub use categories::CategoryContract;
pub use comments::CommentContract;
pub use members::MemberContract;
pub use notifications::NotificationContract;
pub use subtasks::SubTaskContract;
pub use tasks::{TaskContract, TaskData};
pub use users::{PasswordContract, RegistrationContract};
pub use workspaces::WorkspaceContract;
