//! Session state and the store contract.
//!
//! The session is process-wide and owned by exactly one [`SessionStore`].
//! The authenticated client borrows the store and reads the current tokens
//! on every attempt; it never keeps its own copy across calls.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AccessToken, RefreshToken, Result};

pub use memory::MemorySessionStore;

/// The user profile returned by login or registration.
///
/// The shape is defined by the backend, so the profile is kept as raw JSON
/// with accessors for the fields the client displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(serde_json::Value);

impl UserProfile {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The user id, rendered as a string whether the backend sends a number
    /// or a string.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A complete authenticated session.
#[derive(Clone)]
pub struct SessionData {
    pub access_token: AccessToken,
    pub refresh_token: Option<RefreshToken>,
    pub user: Option<UserProfile>,
}

impl SessionData {
    pub fn new(access_token: AccessToken, refresh_token: Option<RefreshToken>) -> Self {
        Self {
            access_token,
            refresh_token,
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("tokens", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the process-wide session.
///
/// Getters return snapshots; mutators are last-write-wins with no
/// transactional coordination between concurrent callers. Only
/// `set_session` can start a session.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Returns the current access token, if any.
    fn access_token(&self) -> Option<AccessToken>;

    /// Returns the current refresh token, if any.
    fn refresh_token(&self) -> Option<RefreshToken>;

    /// Returns the stored user profile, if any.
    fn user(&self) -> Option<UserProfile>;

    /// Replace the whole session (login, registration).
    fn set_session(&self, session: SessionData) -> Result<()>;

    /// Replace the access token, keeping the refresh token and user.
    ///
    /// Returns `false` without storing anything when there is no session,
    /// so a refresh that finishes after a logout cannot revive it.
    fn set_access_token(&self, token: AccessToken) -> Result<bool>;

    /// Drop both tokens and the user, leaving the store unauthenticated.
    fn clear_session(&self) -> Result<()>;

    /// Returns true if an access token is present.
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}
