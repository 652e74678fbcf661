//! Session store persisted as a JSON file.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use healthlog_core::{
    AccessToken, MemorySessionStore, RefreshToken, Result, SessionData, SessionStore,
    StoreError, UserProfile,
};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// On-disk session layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
    saved_at: DateTime<Utc>,
}

impl StoredSession {
    fn from_session(session: &SessionData) -> Self {
        Self {
            access_token: session.access_token.as_str().to_string(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.as_str().to_string()),
            user: session.user.clone(),
            saved_at: Utc::now(),
        }
    }

    fn into_session(self) -> SessionData {
        SessionData {
            access_token: AccessToken::new(self.access_token),
            refresh_token: self.refresh_token.map(RefreshToken::new),
            user: self.user,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A [`SessionStore`] that survives process restarts.
///
/// State lives in memory and is written through to a JSON file on every
/// mutation. The file is created with mode 0600 on Unix, replaced
/// atomically through a temporary file, and guarded by an advisory lock so
/// that two processes sharing a session file never interleave writes.
/// Clearing the session removes the file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    memory: MemorySessionStore,
}

impl FileSessionStore {
    /// Open the store at `path`, loading any session already saved there.
    ///
    /// A missing file is an empty session. A file that exists but cannot be
    /// parsed is an error rather than a silent logout.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let memory = match Self::load(&path)? {
            Some(session) => {
                debug!("Loaded persisted session");
                MemorySessionStore::with_session(session)
            }
            None => {
                debug!("No persisted session");
                MemorySessionStore::new()
            }
        };

        Ok(Self { path, memory })
    }

    /// Returns the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, ".lock")
    }

    fn load(path: &Path) -> Result<Option<SessionData>> {
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path).map_err(io_error(path))?;
        let stored: StoredSession =
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Some(stored.into_session()))
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(io_error(&lock_path))?;

        lock_file.lock_exclusive().map_err(io_error(&lock_path))?;
        Ok(lock_file)
    }

    /// Write the current in-memory state to disk.
    ///
    /// The snapshot is taken after the lock is held, so the last writer
    /// always persists the latest state.
    fn persist(&self) -> Result<()> {
        let lock_file = self.open_lock()?;

        match self.memory.snapshot() {
            Some(session) => self.write_file(&StoredSession::from_session(&session))?,
            None => {
                if self.path.exists() {
                    fs::remove_file(&self.path).map_err(io_error(&self.path))?;
                }
            }
        }

        if let Err(e) = lock_file.unlock() {
            warn!(error = %e, "Failed to release session file lock");
        }

        Ok(())
    }

    fn write_file(&self, stored: &StoredSession) -> Result<()> {
        let json = serde_json::to_string_pretty(stored).map_err(|e| StoreError::Serialize {
            message: e.to_string(),
        })?;

        let tmp_path = with_suffix(&self.path, ".tmp");
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).map_err(io_error(&tmp_path))?;
        file.write_all(json.as_bytes()).map_err(io_error(&tmp_path))?;
        file.sync_all().map_err(io_error(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(io_error(&self.path))?;
        debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl SessionStore for FileSessionStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.memory.access_token()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.memory.refresh_token()
    }

    fn user(&self) -> Option<UserProfile> {
        self.memory.user()
    }

    fn set_session(&self, session: SessionData) -> Result<()> {
        self.memory.set_session(session)?;
        self.persist()
    }

    fn set_access_token(&self, token: AccessToken) -> Result<bool> {
        if !self.memory.set_access_token(token)? {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn clear_session(&self) -> Result<()> {
        self.memory.clear_session()?;
        self.persist()
    }
}
