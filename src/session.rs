//! Session context
//!
//! The one piece of real client state: the token issued at login together
//! with the display name and role cached from the backend. Every view and the
//! API client share one [`SessionContext`]; whatever they read comes from it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::Role;
use crate::{AdminError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Session {
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self { token: token.into(), email: email.into(), display_name: None, role: None }
    }
}

/// Persistence of the session between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file store, the counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "Discarding unreadable session file: {}", e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AdminError::Session(format!("{}: {e}", self.path.display()))),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AdminError::Session(format!("{}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw).map_err(|e| AdminError::Session(format!("{}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AdminError::Session(format!("{}: {e}", self.path.display()))),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> { Ok(self.slot().clone()) }
    fn save(&self, session: &Session) -> Result<()> { *self.slot() = Some(session.clone()); Ok(()) }
    fn clear(&self) -> Result<()> { *self.slot() = None; Ok(()) }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    LoggedOut,
    /// The backend answered 401.
    Rejected,
    /// Validation round trip failed.
    ValidationFailed,
}

/// Shared handle on the current session.
#[derive(Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    store: Arc<dyn SessionStore>,
    invalidations: Arc<watch::Sender<Option<InvalidationReason>>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").field("signed_in", &self.is_signed_in()).finish()
    }
}

impl SessionContext {
    /// Restores whatever the store holds.
    pub fn load(store: Arc<dyn SessionStore>) -> Result<Self> {
        let restored = store.load()?;
        let (tx, _rx) = watch::channel(None);
        Ok(Self { current: Arc::new(RwLock::new(restored)), store, invalidations: Arc::new(tx) })
    }

    pub fn in_memory() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { current: Arc::new(RwLock::new(None)), store: Arc::new(MemorySessionStore::default()), invalidations: Arc::new(tx) }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<Session> { self.read().clone() }
    pub fn token(&self) -> Option<String> { self.read().as_ref().map(|s| s.token.clone()) }
    pub fn is_signed_in(&self) -> bool { self.read().is_some() }

    pub fn display_name(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.display_name.clone().unwrap_or_else(|| s.email.clone()))
    }

    /// Stores a freshly issued session.
    pub fn establish(&self, session: Session) -> Result<()> {
        self.store.save(&session)?;
        tracing::info!(email = %session.email, "Session established");
        *self.write() = Some(session);
        Ok(())
    }

    /// Caches profile data returned by the "who am I" call.
    pub fn update_profile(&self, display_name: Option<String>, role: Option<Role>) -> Result<()> {
        let updated = {
            let mut guard = self.write();
            let Some(session) = guard.as_mut() else { return Ok(()) };
            session.display_name = display_name;
            session.role = role;
            session.clone()
        };
        self.store.save(&updated)
    }

    /// Drops the session everywhere and notifies subscribers.
    pub fn invalidate(&self, reason: InvalidationReason) {
        let had_session = self.write().take().is_some();
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored session: {}", e);
        }
        if had_session {
            tracing::info!(?reason, "Session invalidated");
            self.invalidations.send_replace(Some(reason));
        }
    }

    /// Fires every time the session is invalidated.
    pub fn subscribe(&self) -> watch::Receiver<Option<InvalidationReason>> { self.invalidations.subscribe() }
}
