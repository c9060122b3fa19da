//! JWT access and refresh tokens
//!
//! Both token types carry the user's `token_version`; bumping the version
//! on the user row invalidates every token issued before.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tb_core::config::AuthConfig;
use tb_core::{Id, TbError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    pub jti: String,
    pub email: String,
    pub typ: TokenType,
    /// User token version at issue time
    pub ver: i32,
}

impl Claims {
    pub fn user_id(&self) -> Result<Id, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::Invalid("Invalid user ID in token".to_string()))
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Missing token")]
    Missing,
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

impl From<JwtError> for TbError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(message) => TbError::Internal(message),
            JwtError::Expired => TbError::unauthorized("Token has expired"),
            JwtError::Missing => TbError::unauthorized("Authentication required"),
            JwtError::Invalid(_) => TbError::unauthorized("Invalid token"),
        }
    }
}

/// Tokens handed to a client after login or refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// JWT service for creating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl JwtService {
    pub fn new(secret: &[u8], access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        )
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    fn create_token(
        &self,
        user_id: Id,
        email: &str,
        version: i32,
        typ: TokenType,
        expires_in_seconds: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + expires_in_seconds).max(0) as usize,
            iat: now as usize,
            jti: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            typ,
            ver: version,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    pub fn issue_pair(&self, user_id: Id, email: &str, version: i32) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.create_token(
                user_id,
                email,
                version,
                TokenType::Access,
                self.access_ttl_seconds,
            )?,
            refresh_token: self.create_token(
                user_id,
                email,
                version,
                TokenType::Refresh,
                self.refresh_ttl_seconds,
            )?,
            token_type: "Bearer",
            expires_in: self.access_ttl_seconds,
        })
    }

    /// Validate signature and expiry, and require the given token type
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?;

        if token_data.claims.typ != expected {
            return Err(JwtError::Invalid("Wrong token type".to_string()));
        }

        Ok(token_data.claims)
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(b"test-secret-key-at-least-32-bytes", 900, 3600)
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let service = service();
        let pair = service.issue_pair(1, "test@example.com", 3).unwrap();

        let claims = service.validate(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 1);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.ver, 3);
        assert_eq!(pair.expires_in, 900);

        let refresh = service.validate(&pair.refresh_token, TokenType::Refresh).unwrap();
        assert_eq!(refresh.typ, TokenType::Refresh);
        assert_ne!(claims.jti, refresh.jti);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let service = service();
        let pair = service.issue_pair(1, "a@example.com", 0).unwrap();
        assert!(matches!(
            service.validate(&pair.refresh_token, TokenType::Access),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let token = service
            .create_token(1, "a@example.com", 0, TokenType::Access, -3600)
            .unwrap();
        assert!(matches!(
            service.validate(&token, TokenType::Access),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtService::new(b"another-secret-key-of-enough-size", 900, 3600);
        let pair = other.issue_pair(1, "a@example.com", 0).unwrap();
        assert!(service().validate(&pair.access_token, TokenType::Access).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_error_mapping() {
        let err: TbError = JwtError::Expired.into();
        assert_eq!(err.status_code(), 401);
    }
}
