//! Result type aliases

use crate::error::TbError;

/// Standard Result type for Taskboard operations
pub type TbResult<T> = Result<T, TbError>;
