//! Session store — token, refresh token, and the resolved user profile.
//!
//! DESIGN
//! ======
//! `SessionStore` is an explicitly owned handle (cheap to clone) that the
//! guard and the HTTP pipeline receive at construction. The record behind it
//! is replaced under a single write lock per transition, so a concurrent
//! reader never sees a token from one transition next to a profile from
//! another. Last writer wins.
//!
//! PERSISTENCE
//! ===========
//! Every transition is written through to a `SessionPersistence` backend
//! while the lock is held. Backend failures are logged and swallowed: the
//! in-memory record stays authoritative for the running process.
//!
//! `FilePersistence` writes with blocking `std::fs` calls under that lock,
//! including when a transition happens on an async path (guard exchange, 401
//! clear). The record is a few hundred bytes and the disk order must match
//! the lock order, so the write stays inline. A long-lived server with a slow
//! disk should plug in a backend that hands off to `spawn_blocking` instead.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

/// User profile as returned by the identity provider. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub serde_json::Value);

/// A token / refresh-token pair. Both halves are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Returns `None` unless both values are non-empty.
    #[must_use]
    pub fn new(token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let refresh_token = refresh_token.into();
        if token.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(Self { token, refresh_token })
    }
}

/// The unit of authentication state.
///
/// Invariant: `user_info` is only meaningful while `token` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user_info: Option<Profile>,
}

impl Session {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Token present and profile resolved.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.has_token() && self.user_info.is_some()
    }

    /// Drop an orphaned profile (profile without token) to the empty session.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.user_info.is_some() && !self.has_token() {
            tracing::warn!("discarding orphaned profile without token");
            return Self::default();
        }
        self
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_SESSION_IO",
            Self::Serde(_) => "E_SESSION_FORMAT",
        }
    }
}

/// Storage backend that lets a session survive process restarts.
pub trait SessionPersistence: Send + Sync {
    /// Load the stored session, `None` when nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the backend cannot be read or decoded.
    fn load(&self) -> Result<Option<Session>, SessionError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the backend cannot be written.
    fn save(&self, session: &Session) -> Result<(), SessionError>;
}

/// Keeps nothing. Sessions live only as long as the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPersistence;

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(None)
    }

    fn save(&self, _session: &Session) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Stores the session as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves half a record on disk.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Shared handle to the process-wide session record.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.snapshot();
        f.debug_struct("SessionStore")
            .field("has_token", &session.has_token())
            .field("has_profile", &session.user_info.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Empty, non-persistent store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(RwLock::new(Session::default())), persistence: Arc::new(MemoryPersistence) }
    }

    /// Open a store backed by `persistence`, loading whatever it holds.
    ///
    /// An unreadable or invalid stored record starts the process with an
    /// empty session.
    #[must_use]
    pub fn open(persistence: Arc<dyn SessionPersistence>) -> Self {
        let session = match persistence.load() {
            Ok(Some(stored)) => stored.normalized(),
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persisted session; starting empty");
                Session::default()
            }
        };
        tracing::debug!(
            has_token = session.has_token(),
            has_profile = session.user_info.is_some(),
            "session store opened"
        );
        Self { inner: Arc::new(RwLock::new(session)), persistence }
    }

    /// Copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current token, `None` when absent.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let session = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        session.has_token().then(|| session.token.clone())
    }

    /// Replace the credential pair. Any previously resolved profile belonged
    /// to the old token and is dropped in the same write.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.replace(Session { token: credentials.token, refresh_token: credentials.refresh_token, user_info: None });
        tracing::debug!("session credentials stored");
    }

    /// Attach a profile resolved for `token`.
    ///
    /// Returns `false` (and leaves the session untouched) when the session no
    /// longer holds that token: either it was cleared, which would orphan the
    /// profile, or another transition replaced the credentials meanwhile.
    pub fn set_profile(&self, token: &str, profile: Profile) -> bool {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !session.has_token() || session.token != token {
            tracing::warn!("refusing to store profile for a token the session no longer holds");
            return false;
        }
        session.user_info = Some(profile);
        self.persist(&session);
        tracing::debug!("session profile stored");
        true
    }

    /// Wipe token, refresh token and profile together.
    pub fn clear(&self) {
        self.replace(Session::default());
        tracing::debug!("session cleared");
    }

    fn replace(&self, next: Session) {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *session = next;
        self.persist(&session);
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.persistence.save(session) {
            tracing::warn!(error = %e, code = e.error_code(), "failed to persist session");
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
