//! Operator login. A single configured credential; successful logins get an
//! opaque bearer token held in memory until it expires or is revoked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("missing, expired or revoked session token")]
    InvalidToken,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_token() -> String {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("sess-{id:06}-{nanos:09}")
}

struct Session {
    expires_at: DateTime<Utc>,
}

/// In-memory session table keyed by token.
pub struct SessionStore {
    credentials: Credentials,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(credentials: Credentials, ttl_hours: i64) -> Self {
        SessionStore {
            credentials,
            ttl: Duration::hours(ttl_hours),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn login(&self, request: &LoginRequest) -> Result<IssuedToken, AuthError> {
        if request.username != self.credentials.username
            || request.password != self.credentials.password
        {
            return Err(AuthError::InvalidCredentials);
        }
        let token = next_token();
        let expires_at = Utc::now() + self.ttl;
        self.sessions
            .write()
            .expect("session lock poisoned")
            .insert(token.clone(), Session { expires_at });
        Ok(IssuedToken { token, expires_at })
    }

    /// Validates a bearer token, dropping it when it has expired.
    pub fn authorize(&self, token: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        {
            let guard = self.sessions.read().expect("session lock poisoned");
            match guard.get(token) {
                Some(session) if session.expires_at > now => return Ok(()),
                Some(_) => {}
                None => return Err(AuthError::InvalidToken),
            }
        }
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token);
        Err(AuthError::InvalidToken)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token)
            .is_some()
    }
}
