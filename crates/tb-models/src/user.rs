//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable, Timestamped};
use validator::Validate;

/// A registered account
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    /// `None` for accounts created through OAuth only
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub oauth_provider: Option<String>,
    #[serde(skip_serializing)]
    pub oauth_subject: Option<String>,
    /// Embedded in issued tokens; bumping it revokes them
    #[serde(skip_serializing)]
    pub token_version: i32,
    pub email_notifications: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl Identifiable for User {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for User {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for User {
    const TABLE_NAME: &'static str = "users";
    const TYPE_NAME: &'static str = "User";
}

/// Public projection of a user, embedded in other resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// DTO for inserting a user
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub name: String,
    /// Stored lowercased
    pub email: String,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
}

/// DTO for updating profile attributes
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub email_notifications: Option<bool>,
}

/// POST /auth/register
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
}

/// POST /auth/login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub password: String,
}

/// POST /auth/refresh; the token may instead come from the refresh cookie
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// PATCH /users/me
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub avatar_url: Option<Option<String>>,
    pub email_notifications: Option<bool>,
}

/// PUT /users/me/password
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Required unless the account has no password yet (OAuth-only)
    pub current_password: Option<String>,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn user() -> User {
        User {
            id: 7,
            name: Name().fake(),
            email: SafeEmail().fake(),
            password_hash: Some("$argon2id$...".into()),
            avatar_url: None,
            oauth_provider: None,
            oauth_subject: None,
            token_version: 3,
            email_notifications: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("tokenVersion").is_none());
        assert!(json.get("oauthSubject").is_none());
        assert_eq!(json["emailNotifications"], true);
    }

    #[test]
    fn test_summary() {
        let user = user();
        let summary = user.summary();
        assert_eq!(summary.id, 7);
        assert_eq!(summary.email, user.email);
        assert!(user.has_password());
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            name: Name().fake(),
            email: SafeEmail().fake(),
            password: "correct-horse-1".into(),
        };
        assert!(valid.validate().is_ok());

        let invalid = RegisterRequest {
            name: String::new(),
            email: "nope".into(),
            password: "short".into(),
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
