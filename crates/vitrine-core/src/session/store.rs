//! Session storage.
//!
//! The store keeps the live session in memory and mirrors every change to a
//! [`SessionBackend`]. The backend persists three string entries under fixed
//! keys (`access_token`, `refresh_token`, `user`) which are always written and
//! cleared together.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Credentials, Session, User};

/// Raw persisted entries. Any missing entry means "no session".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Serialized JSON user record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PersistedSession {
    fn from_session(session: &Session) -> Result<Self> {
        let user = serde_json::to_string(&session.user).context("Failed to serialize user")?;
        Ok(Self {
            access_token: Some(session.credentials.access_token.clone()),
            refresh_token: Some(session.credentials.refresh_token.clone()),
            user: Some(user),
        })
    }

    fn into_session(self) -> Result<Option<Session>> {
        let (Some(access), Some(refresh), Some(user)) =
            (self.access_token, self.refresh_token, self.user)
        else {
            return Ok(None);
        };

        let user: User = serde_json::from_str(&user).context("Stored user record is malformed")?;
        Ok(Some(Session {
            credentials: Credentials::new(access, refresh),
            user,
        }))
    }
}

/// Durable storage behind a [`SessionStore`].
pub trait SessionBackend: Send + Sync {
    /// Reads the persisted entries, if any.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read.
    fn read(&self) -> Result<Option<PersistedSession>>;

    /// Overwrites all entries.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn write(&self, entries: &PersistedSession) -> Result<()>;

    /// Removes all entries. Must be idempotent.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<Option<PersistedSession>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds the given entries.
    pub fn with_entries(entries: PersistedSession) -> Self {
        Self {
            entries: Mutex::new(Some(entries)),
        }
    }
}

impl SessionBackend for MemoryBackend {
    fn read(&self) -> Result<Option<PersistedSession>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, entries: &PersistedSession) -> Result<()> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = Some(entries.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// JSON file storage with restricted permissions (0600).
///
/// Tokens are never logged or displayed in full.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionBackend for FileBackend {
    fn read(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn write(&self, entries: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(entries).context("Failed to serialize session")?;
        let tmp_path = self.path.with_extension("json.tmp");

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Holder of the current session.
///
/// Writers take the lock for the whole update, so readers see either the old
/// session or the new one, never a mix of old and new tokens.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    backend: Box<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(backend: impl SessionBackend + 'static) -> Self {
        Self {
            current: RwLock::new(None),
            backend: Box::new(backend),
        }
    }

    /// Store without persistence beyond the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Overwrites credentials and user record.
    ///
    /// # Errors
    /// Returns an error if the backend write fails; memory is left unchanged.
    pub fn save(&self, credentials: Credentials, user: User) -> Result<()> {
        let session = Session { credentials, user };
        let entries = PersistedSession::from_session(&session)?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.backend.write(&entries)?;
        *current = Some(session);
        Ok(())
    }

    /// Replaces both tokens of the live session, keeping the user record.
    ///
    /// # Errors
    /// Fails if there is no live session or the backend write fails.
    pub fn replace_credentials(&self, credentials: Credentials) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = current.as_ref() else {
            anyhow::bail!("No active session to update");
        };

        let updated = Session {
            credentials,
            user: session.user.clone(),
        };
        self.backend
            .write(&PersistedSession::from_session(&updated)?)?;
        *current = Some(updated);
        Ok(())
    }

    /// Returns the live session, if any.
    pub fn load(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read_with(|s| s.credentials.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_with(|s| s.credentials.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_with(|s| s.credentials.refresh_token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read_with(|s| s.user.clone())
    }

    /// Removes everything, in memory and in the backend. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be cleared; memory is cleared
    /// regardless.
    pub fn clear(&self) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        self.backend.clear()
    }

    /// Loads the persisted session into memory.
    ///
    /// Unreadable, incomplete or malformed entries are wiped and reported as
    /// no session.
    ///
    /// # Errors
    /// Returns an error only if a bad entry cannot be wiped.
    pub fn restore(&self) -> Result<Option<Session>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let entries = match self.backend.read() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                *current = None;
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!("Discarding unreadable stored session: {err:#}");
                *current = None;
                self.backend.clear()?;
                return Ok(None);
            }
        };

        let session = match entries.into_session() {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!("Discarding stored session: {err:#}");
                None
            }
        };
        if session.is_none() {
            self.backend.clear()?;
        }

        (*current).clone_from(&session);
        Ok(session)
    }

    fn read_with<T>(&self, f: impl FnOnce(&Session) -> T) -> Option<T> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &self.load())
            .finish_non_exhaustive()
    }
}
