//! # tb-db
//!
//! PostgreSQL persistence for Taskboard.
//!
//! Each entity has a store trait, which services depend on, and a
//! `*Repository` implementing it over a `PgPool`. With the `mock` feature
//! every trait also gets a `Mock*Store` generated by `mockall`.
//!
//! ## Example
//!
//! ```ignore
//! use tb_db::{Database, TaskRepository, TaskStore};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let tasks = TaskRepository::new(db.pool().clone());
//! let task = tasks.find_by_id(1).await?;
//! ```

pub mod activities;
pub mod attachments;
pub mod categories;
pub mod comments;
pub mod members;
pub mod notifications;
pub mod pool;
pub mod query_executor;
pub mod repository;
pub mod subtasks;
pub mod tasks;
pub mod users;
pub mod workspaces;

pub use pool::{Database, DatabaseConfig, PoolStats};
pub use repository::{Pagination, PaginatedResult, RepositoryError, RepositoryResult};
pub use query_executor::{TaskQueryExecutor, TaskScope};

pub use activities::{ActivityRepository, ActivityStore};
pub use attachments::{AttachmentRepository, AttachmentStore};
pub use categories::{CategoryRepository, CategoryStore};
pub use comments::{CommentRepository, CommentStore};
pub use members::{MemberRepository, MemberStore};
pub use notifications::{NotificationRepository, NotificationStore};
pub use subtasks::{SubTaskRepository, SubTaskStore};
pub use tasks::{TaskRepository, TaskStore};
pub use users::{UserRepository, UserStore};
pub use workspaces::{WorkspaceRepository, WorkspaceStore};

#[cfg(feature = "mock")]
pub use activities::MockActivityStore;
#[cfg(feature = "mock")]
pub use attachments::MockAttachmentStore;
#[cfg(feature = "mock")]
pub use categories::MockCategoryStore;
#[cfg(feature = "mock")]
pub use comments::MockCommentStore;
#[cfg(feature = "mock")]
pub use members::MockMemberStore;
#[cfg(feature = "mock")]
pub use notifications::MockNotificationStore;
#[cfg(feature = "mock")]
pub use subtasks::MockSubTaskStore;
#[cfg(feature = "mock")]
pub use tasks::MockTaskStore;
#[cfg(feature = "mock")]
pub use users::MockUserStore;
#[cfg(feature = "mock")]
pub use workspaces::MockWorkspaceStore;
