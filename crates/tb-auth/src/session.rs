//! Short-lived server-side sessions and cookie helpers
//!
//! Sessions only hold the state of an OAuth handshake in flight (CSRF state
//! and PKCE verifier). API authentication itself uses bearer tokens.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "tb_session";
pub const REFRESH_COOKIE: &str = "tb_refresh";

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Session expired")]
    Expired,
}

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub data: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(lifetime_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            data: HashMap::new(),
            created_at: now,
            expires_at: now + Duration::seconds(lifetime_seconds),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|s| s.as_str())
    }

    /// Builder form of [`Session::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }
}

/// Generate a secure random session ID
fn generate_session_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const SESSION_ID_LENGTH: usize = 64;

    let mut rng = rand::rng();
    (0..SESSION_ID_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Session store trait for different backends
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Option<Session>;

    fn set(&self, session: Session);

    fn delete(&self, session_id: &str);

    /// Remove and return a session; used for one-shot OAuth state
    fn take(&self, session_id: &str) -> Result<Session, SessionError>;

    /// Drop expired sessions, returning how many were removed
    fn cleanup_expired(&self) -> usize;
}

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .get(session_id)
            .filter(|s| s.is_valid())
            .cloned()
    }

    fn set(&self, session: Session) {
        self.sessions.write().insert(session.id.clone(), session);
    }

    fn delete(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    fn take(&self, session_id: &str) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .write()
            .remove(session_id)
            .ok_or(SessionError::NotFound)?;
        if session.is_valid() {
            Ok(session)
        } else {
            Err(SessionError::Expired)
        }
    }

    fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_valid_at(now));
        before - sessions.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes of a `Set-Cookie` header
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: Option<i64>,
}

impl CookieConfig {
    /// Cookie carrying the OAuth handshake session id
    pub fn session(secure: bool, max_age: i64) -> Self {
        Self {
            name: SESSION_COOKIE.to_string(),
            path: "/api/v1/auth".to_string(),
            domain: None,
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Some(max_age),
        }
    }

    /// Cookie carrying the refresh token
    pub fn refresh(secure: bool, max_age: i64) -> Self {
        Self {
            name: REFRESH_COOKIE.to_string(),
            path: "/api/v1/auth".to_string(),
            domain: None,
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Some(max_age),
        }
    }

    /// Build cookie header value
    pub fn build_cookie(&self, value: &str) -> String {
        let mut parts = vec![format!("{}={}", self.name, value)];

        parts.push(format!("Path={}", self.path));

        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={}", domain));
        }

        if self.secure {
            parts.push("Secure".to_string());
        }

        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        match self.same_site {
            SameSite::Strict => parts.push("SameSite=Strict".to_string()),
            SameSite::Lax => parts.push("SameSite=Lax".to_string()),
            SameSite::None => parts.push("SameSite=None".to_string()),
        }

        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }

        parts.join("; ")
    }

    /// Build cookie header that clears the cookie
    pub fn build_clear_cookie(&self) -> String {
        Self {
            max_age: Some(0),
            ..self.clone()
        }
        .build_cookie("")
    }
}

/// Read one cookie's value from a `Cookie` header
pub fn extract_cookie(cookie_header: &str, cookie_name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
