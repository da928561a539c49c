//!
//! conectatech storage module
//! --------------------------
//! Durable key-value area holding the last known session so a restart can resume it.
//! Two fixed keys are used: `userToken` (opaque bearer token) and `userData` (the
//! serialized user record). Nothing here interprets the session beyond (de)serializing it.
//!
//! Write ordering keeps a torn pair from ever loading as a session:
//! - `save` writes `userData` first and `userToken` last;
//! - `clear` removes `userToken` first and `userData` last;
//! - `load` only accepts both keys together and purges a lone leftover.
//!
//! When `clear` cannot remove the token it blanks it instead, and until a clear succeeds
//! the store reports no token and no session, so a failed logout never resumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::identity::{Session, User};

pub mod kv;

pub use kv::{FileStorage, MemoryStorage};

pub const TOKEN_KEY: &str = "userToken";
pub const USER_KEY: &str = "userData";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt stored value: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Io(_) => "storage_io",
            StorageError::Corrupt(_) => "storage_corrupt",
        };
        AppError::Storage { code: code.into(), message: err.to_string() }
    }
}

/// Platform key-value primitive the session cache sits on.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Durable copy of the current session.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStorage>,
    /// Set while a clear has failed and not yet been redone; shared by clones.
    purge_pending: Arc<AtomicBool>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStorage>) -> Self {
        Self { backend, purge_pending: Arc::new(AtomicBool::new(false)) }
    }

    /// True after a failed `clear` until a later `clear` or `save` succeeds.
    pub fn purge_pending(&self) -> bool { self.purge_pending.load(Ordering::SeqCst) }

    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryStorage::new())) }

    /// Last persisted session, or `None` when nothing usable is stored.
    /// Missing, torn and corrupt entries all read as `None`; the caller is never failed.
    pub fn load(&self) -> Option<Session> {
        if self.purge_pending() {
            debug!(target: "storage", "session.load skipped; purge pending");
            return None;
        }
        let token = match self.backend.get(TOKEN_KEY) {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "storage", "session.load token read failed: {}", e);
                return None;
            }
        };
        let user_json = match self.backend.get(USER_KEY) {
            Ok(u) => u,
            Err(e) => {
                warn!(target: "storage", "session.load user read failed: {}", e);
                return None;
            }
        };
        match (token, user_json) {
            (Some(token), Some(user_json)) if !token.is_empty() => {
                match serde_json::from_str::<User>(&user_json) {
                    Ok(user) => {
                        debug!(target: "storage", "session.load user_id={}", user.id);
                        Some(Session { user, token })
                    }
                    Err(e) => {
                        warn!(target: "storage", "session.load discarding corrupt user record: {}", e);
                        None
                    }
                }
            }
            (None, None) => None,
            _ => {
                warn!(target: "storage", "session.load found a partial session; purging");
                if let Err(e) = self.clear() {
                    warn!(target: "storage", "session.load purge of partial session failed: {}", e);
                }
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user)?;
        self.backend.set(USER_KEY, &user_json)?;
        self.backend.set(TOKEN_KEY, &session.token)?;
        // both keys now hold the new session, so any earlier leftover is gone
        self.purge_pending.store(false, Ordering::SeqCst);
        debug!(target: "storage", "session.save user_id={}", session.user.id);
        Ok(())
    }

    /// Removes both keys. The token goes first so a failure half way leaves no loadable session.
    /// If the token cannot be removed it is overwritten with an empty value, which `load`
    /// treats as a partial pair after a restart.
    pub fn clear(&self) -> Result<(), StorageError> {
        let res = self.remove_pair();
        self.purge_pending.store(res.is_err(), Ordering::SeqCst);
        if res.is_ok() {
            debug!(target: "storage", "session.clear");
        }
        res
    }

    fn remove_pair(&self) -> Result<(), StorageError> {
        if let Err(e) = self.backend.remove(TOKEN_KEY) {
            match self.backend.set(TOKEN_KEY, "") {
                Ok(()) => warn!(target: "storage", "session.clear token remove failed; token blanked: {}", e),
                Err(e2) => warn!(target: "storage", "session.clear token remove and blank both failed: {}; {}", e, e2),
            }
            if let Err(e2) = self.backend.remove(USER_KEY) {
                warn!(target: "storage", "session.clear user remove failed: {}", e2);
            }
            return Err(e);
        }
        self.backend.remove(USER_KEY)
    }

    /// Bearer token for outgoing requests, if any. None while a purge is pending.
    pub fn token(&self) -> Option<String> {
        if self.purge_pending() {
            return None;
        }
        match self.backend.get(TOKEN_KEY) {
            Ok(Some(t)) if !t.is_empty() => Some(t),
            Ok(_) => None,
            Err(e) => {
                warn!(target: "storage", "token read failed: {}", e);
                None
            }
        }
    }
}
