//! Category guards and contracts

use tb_core::{Id, TbResult, ValidationErrors};
use tb_models::category::HEX_COLOR;
use tb_models::{CreateCategoryRequest, UpdateCategoryRequest};

use crate::base::{authorize, validate_required_text, Contract, UserContext, ValidationResult};
use crate::permissions;

pub const NAME_MAX: usize = 50;

pub struct CategoryContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> CategoryContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    pub fn view(&self, workspace_id: Id) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::VIEW_WORKSPACE, workspace_id),
            "You are not a member of this workspace",
        )
    }

    pub fn manage(&self, workspace_id: Id) -> TbResult<()> {
        authorize(
            self.user
                .allowed_in_workspace(permissions::MANAGE_CATEGORIES, workspace_id),
            "You are not allowed to manage categories",
        )
    }

    fn validate_color(errors: &mut ValidationErrors, color: Option<&String>) {
        if let Some(color) = color {
            if !HEX_COLOR.is_match(color) {
                errors.add("color", "must be a hex color like #1A2B3C");
            }
        }
    }
}

impl<U: UserContext> Contract<CreateCategoryRequest> for CategoryContract<'_, U> {
    fn validate(&self, request: &CreateCategoryRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "name", &request.name, NAME_MAX);
        Self::validate_color(&mut errors, request.color.as_ref());
        errors.into_result()
    }
}

impl<U: UserContext> Contract<UpdateCategoryRequest> for CategoryContract<'_, U> {
    fn validate(&self, request: &UpdateCategoryRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &request.name {
            validate_required_text(&mut errors, "name", name, NAME_MAX);
        }
        Self::validate_color(&mut errors, request.color.as_ref());
        errors.into_result()
    }
}
