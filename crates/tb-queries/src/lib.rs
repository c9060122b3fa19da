//! # tb-queries
//!
//! Query model for task lists.
//!
//! The API hands the raw query string to [`TaskQuery::parse`], which checks
//! every parameter and produces typed filters, a sort order and pagination.
//! Rendering to SQL happens in `tb-db`.
//!
//! ## Structure
//!
//! - `filters` - Filter values (`status`, `assignee`, `dueBefore`, ...)
//! - `sorts` - Sortable fields and the `ORDER BY` they produce
//! - `query` - Query string parameters and the parsed [`TaskQuery`]
//!
//! ## Example
//!
//! ```
//! use tb_queries::{TaskQuery, TaskQueryParams};
//!
//! let params = TaskQueryParams {
//!     status: Some("todo,in_progress".into()),
//!     assignee: Some("me".into()),
//!     sort_by: Some("dueDate:asc".into()),
//!     ..Default::default()
//! };
//! let query = TaskQuery::parse(&params).unwrap();
//! assert_eq!(query.filters.statuses.len(), 2);
//! ```

pub mod filters;
pub mod query;
pub mod sorts;

pub use filters::{AssigneeFilter, CategoryFilter, CreatorFilter, TaskFilters};
pub use query::{TaskQuery, TaskQueryParams};
pub use sorts::{TaskSort, TaskSortField, TaskSortOrder};
