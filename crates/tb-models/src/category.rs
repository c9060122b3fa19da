//! Category model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable, WorkspaceScoped};
use validator::Validate;

pub const DEFAULT_COLOR: &str = "#6B7280";

pub static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern"));

/// A label tasks inside one workspace can be grouped by
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Id,
    pub workspace_id: Id,
    pub name: String,
    pub color: String,
    pub created_by_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Category {
    fn id(&self) -> Id {
        self.id
    }
}

impl WorkspaceScoped for Category {
    fn workspace_id(&self) -> Id {
        self.workspace_id
    }
}

impl Entity for Category {
    const TABLE_NAME: &'static str = "categories";
    const TYPE_NAME: &'static str = "Category";
}

#[derive(Debug, Clone)]
pub struct CreateCategoryDto {
    pub workspace_id: Id,
    pub name: String,
    pub color: String,
    pub created_by_id: Id,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryDto {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// POST /workspaces/:id/categories
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(regex(path = "HEX_COLOR", message = "must be a hex color like #1A2B3C"))]
    pub color: Option<String>,
}

/// PATCH /categories/:id
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(regex(path = "HEX_COLOR", message = "must be a hex color like #1A2B3C"))]
    pub color: Option<String>,
}
