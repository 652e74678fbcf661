//! In-memory session store.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{AccessToken, RefreshToken, Result};

use super::{SessionData, SessionStore, UserProfile};

/// Process-local session store.
///
/// Nothing survives a restart. Also the in-memory half of the file-backed
/// store in `healthlog-store`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<Option<SessionData>>,
}

impl MemorySessionStore {
    /// Create an empty (unauthenticated) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a session.
    pub fn with_session(session: SessionData) -> Self {
        Self {
            state: RwLock::new(Some(session)),
        }
    }

    /// Returns a copy of the whole session.
    pub fn snapshot(&self) -> Option<SessionData> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<SessionData>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<SessionData>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.read().as_ref().and_then(|s| s.refresh_token.clone())
    }

    fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    fn set_session(&self, session: SessionData) -> Result<()> {
        *self.write() = Some(session);
        Ok(())
    }

    fn set_access_token(&self, token: AccessToken) -> Result<bool> {
        match self.write().as_mut() {
            Some(session) => {
                session.access_token = token;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear_session(&self) -> Result<()> {
        *self.write() = None;
        Ok(())
    }
}
