//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable};
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id,
    pub task_id: Id,
    pub user_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

impl Identifiable for Comment {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Comment {
    const TABLE_NAME: &'static str = "comments";
    const TYPE_NAME: &'static str = "Comment";
}

/// Comment joined with its author's public profile
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
}

/// POST /tasks/:id/comments
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"))]
    pub content: String,
}

/// PATCH /comments/:id
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"))]
    pub content: String,
}
