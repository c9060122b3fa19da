//! # tb-models
//!
//! Domain models for Taskboard.
//!
//! Each entity is a plain struct loaded straight from its table with
//! `sqlx::FromRow`, plus the DTOs the repositories accept and the request
//! payloads the API validates.

pub mod activity;
pub mod attachment;
pub mod category;
pub mod comment;
pub mod member;
pub mod notification;
pub mod patch;
pub mod subtask;
pub mod task;
pub mod user;
pub mod workspace;

pub use activity::{ActivityAction, ActivityLog, EntityType, NewActivity};
pub use attachment::{Attachment, NewAttachment};
pub use category::{
    Category, CreateCategoryDto, CreateCategoryRequest, UpdateCategoryDto, UpdateCategoryRequest,
};
pub use comment::{Comment, CommentWithAuthor, CreateCommentRequest, UpdateCommentRequest};
pub use member::{
    Invitation, InviteMemberRequest, MemberStatus, MemberWithUser, TransferOwnershipRequest,
    UpdateMemberRoleRequest, WorkspaceMember, WorkspaceRole,
};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use subtask::{CreateSubTaskRequest, SubTask, UpdateSubTaskDto, UpdateSubTaskRequest};
pub use task::{
    AssignTaskRequest, ChangeStatusRequest, CreateTaskDto, CreateTaskRequest, DueTaskReminder,
    Task, TaskPriority, TaskStatus, UpdateTaskDto, UpdateTaskRequest,
};
pub use user::{
    ChangePasswordRequest, CreateUserDto, LoginRequest, RefreshRequest, RegisterRequest,
    UpdateProfileRequest, UpdateUserDto, User, UserSummary,
};
pub use workspace::{
    CreateWorkspaceDto, CreateWorkspaceRequest, UpdateWorkspaceDto, UpdateWorkspaceRequest,
    Workspace, WorkspaceWithRole,
};

/// Error for a string that names no variant of a stored enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {type_name}")]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

/// Implements string conversions and VARCHAR column mapping for a fieldless enum.
///
/// The database keeps these as `VARCHAR` with a `CHECK` constraint, so the
/// enum encodes and decodes through `&str`.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::ParseEnumError {
                        type_name: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }
    };
}

pub(crate) use text_enum;
