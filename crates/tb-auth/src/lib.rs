//! # tb-auth
//!
//! Authentication and authorization for Taskboard.
//!
//! ## Features
//!
//! - Argon2 password hashing
//! - JWT access and refresh tokens
//! - Short-lived sessions for the OAuth handshake
//! - Google and GitHub OAuth login
//! - Workspace role permission matrix
//! - Fixed-window rate limiting

pub mod jwt;
pub mod oauth;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod session;

pub use jwt::{extract_bearer_token, Claims, JwtError, JwtService, TokenPair, TokenType};
pub use oauth::{OAuthError, OAuthProfile, OAuthProvider, OAuthService, PendingAuthorization};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{role_allows, role_permissions, CurrentUser};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use session::{
    extract_cookie, CookieConfig, MemorySessionStore, SameSite, Session, SessionError,
    SessionStore, REFRESH_COOKIE, SESSION_COOKIE,
};
