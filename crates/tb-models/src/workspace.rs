//! Workspace model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable, Timestamped};
use validator::Validate;

use crate::member::WorkspaceRole;

/// A container of tasks with role-based membership
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    /// Created at registration; single member, cannot be shared or deleted
    pub is_personal: bool,
    pub owner_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Workspace {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Workspace {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Workspace {
    const TABLE_NAME: &'static str = "workspaces";
    const TYPE_NAME: &'static str = "Workspace";
}

/// A workspace as seen by one of its members
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceWithRole {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workspace: Workspace,
    pub role: WorkspaceRole,
    pub member_count: i64,
}

/// DTO for inserting a workspace together with its owner membership
#[derive(Debug, Clone)]
pub struct CreateWorkspaceDto {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Id,
    pub is_personal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateWorkspaceDto {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl From<UpdateWorkspaceRequest> for UpdateWorkspaceDto {
    fn from(req: UpdateWorkspaceRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
        }
    }
}

/// POST /workspaces
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "is too long (maximum is 1000 characters)"))]
    pub description: Option<String>,
}

/// PATCH /workspaces/:id
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWorkspaceRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub description: Option<Option<String>>,
}
