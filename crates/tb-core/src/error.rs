//! Core error types for Taskboard
//!
//! Every service returns [`TbError`]; the API layer maps it onto HTTP responses.

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type for all Taskboard operations
#[derive(Error, Debug)]
pub enum TbError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Conflict: {message}")]
    Conflict { message: String },
}

impl TbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        TbError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        TbError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        TbError::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        TbError::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TbError::Internal(message.into())
    }

    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        TbError::Validation(errors)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            TbError::NotFound { .. } => 404,
            TbError::Unauthorized { .. } => 401,
            TbError::Forbidden { .. } => 403,
            TbError::Validation(_) => 422,
            TbError::RateLimited { .. } => 429,
            TbError::Conflict { .. } => 409,
            TbError::Database(_) | TbError::Internal(_) => 500,
            TbError::Config(_) => 500,
            TbError::ExternalService { .. } => 502,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TbError::NotFound { .. } => "not_found",
            TbError::Unauthorized { .. } => "unauthorized",
            TbError::Forbidden { .. } => "forbidden",
            TbError::Validation(_) => "validation_failed",
            TbError::Database(_) => "database_error",
            TbError::Internal(_) => "internal_error",
            TbError::Config(_) => "configuration_error",
            TbError::ExternalService { .. } => "external_service_error",
            TbError::RateLimited { .. } => "rate_limited",
            TbError::Conflict { .. } => "conflict",
        }
    }
}

/// Validation errors collection, keyed by attribute name
///
/// A `BTreeMap` keeps `full_messages` output stable.
#[derive(Error, Debug, Default, Clone, PartialEq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(source: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in source.field_errors() {
            for error in field_errors {
                let message = match &error.message {
                    Some(message) => message.to_string(),
                    None => describe_validator_code(&error.code),
                };
                errors.add(field.to_string(), message);
            }
        }
        errors
    }
}

impl From<validator::ValidationErrors> for TbError {
    fn from(source: validator::ValidationErrors) -> Self {
        TbError::Validation(source.into())
    }
}

fn describe_validator_code(code: &str) -> String {
    match code {
        "length" => "has an invalid length".to_string(),
        "email" => "is not a valid email address".to_string(),
        "url" => "is not a valid URL".to_string(),
        "range" => "is out of range".to_string(),
        "required" => "can't be blank".to_string(),
        other => format!("is invalid ({})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8, message = "is too short (minimum is 8 characters)"))]
        password: String,
    }

    #[test]
    fn test_validation_errors_collect_and_merge() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("title", "can't be blank");
        let mut other = ValidationErrors::new();
        other.add("title", "is too long");
        other.add_base("Task is locked");
        errors.merge(other);

        assert!(errors.has_error("title"));
        assert_eq!(errors.get("title").map(Vec::len), Some(2));
        assert_eq!(
            errors.full_messages(),
            vec![
                "Task is locked".to_string(),
                "title can't be blank".to_string(),
                "title is too long".to_string(),
            ]
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add_base("nope");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_from_validator_errors() {
        let signup = Signup {
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors: ValidationErrors = signup.validate().unwrap_err().into();

        assert_eq!(
            errors.get("email"),
            Some(&vec!["is not a valid email address".to_string()])
        );
        assert_eq!(
            errors.get("password"),
            Some(&vec!["is too short (minimum is 8 characters)".to_string()])
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TbError::not_found("Task", 1).status_code(), 404);
        assert_eq!(TbError::forbidden("no").status_code(), 403);
        assert_eq!(TbError::invalid("title", "can't be blank").status_code(), 422);
        assert_eq!(
            TbError::RateLimited {
                retry_after_seconds: 5
            }
            .error_code(),
            "rate_limited"
        );
    }
}
