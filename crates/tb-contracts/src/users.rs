//! Account contracts

use tb_core::ValidationErrors;
use tb_models::{RegisterRequest, UpdateProfileRequest};

use crate::base::{validate_max_length, validate_required_text, ValidationResult};

pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const NAME_MAX: usize = 100;

/// Password strength: length bounds plus at least one letter and one digit
pub struct PasswordContract;

impl PasswordContract {
    pub fn check(errors: &mut ValidationErrors, field: &str, password: &str) {
        let length = password.chars().count();
        if length < PASSWORD_MIN {
            errors.add(field, format!("is too short (minimum is {PASSWORD_MIN} characters)"));
        } else if length > PASSWORD_MAX {
            errors.add(field, format!("is too long (maximum is {PASSWORD_MAX} characters)"));
        }
        if !password.chars().any(|c| c.is_alphabetic()) {
            errors.add(field, "must contain a letter");
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            errors.add(field, "must contain a digit");
        }
    }

    pub fn validate(field: &str, password: &str) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        Self::check(&mut errors, field, password);
        errors.into_result()
    }
}

/// Registration and profile attributes
pub struct RegistrationContract;

impl RegistrationContract {
    pub fn validate(request: &RegisterRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "name", &request.name, NAME_MAX);
        if !request.email.contains('@') {
            errors.add("email", "is not a valid email address");
        }
        PasswordContract::check(&mut errors, "password", &request.password);
        errors.into_result()
    }

    pub fn validate_profile(request: &UpdateProfileRequest) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &request.name {
            validate_required_text(&mut errors, "name", name, NAME_MAX);
        }
        if let Some(Some(url)) = &request.avatar_url {
            validate_max_length(&mut errors, "avatarUrl", url, 2048);
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                errors.add("avatarUrl", "must be an http(s) URL");
            }
        }
        errors.into_result()
    }
}
