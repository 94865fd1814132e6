use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ClientError;
use crate::auth::User;

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "user";

/// What a logged-in client remembers between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted session not read yet.
    Loading,
    Anonymous,
    Authenticated(Session),
}

/// String key/value persistence, the client's "local storage".
pub trait SessionStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(tmp, self.path(key))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// Holds the current session and keeps it in sync with storage.
///
/// Starts in [`SessionState::Loading`]; call [`SessionStore::restore`] once
/// before asking the guard anything. Nothing here checks whether the
/// server still honours the token: a restored session can be stale.
pub struct SessionStore<S> {
    storage: S,
    state: SessionState,
}

impl<S: SessionStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: SessionState::Loading,
        }
    }

    /// Reads the persisted session. Unreadable data is dropped and the
    /// store becomes anonymous.
    pub fn restore(&mut self) -> &SessionState {
        self.state = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    debug!(user_id = %session.user.id, "session restored");
                    SessionState::Authenticated(session)
                }
                Err(e) => {
                    warn!(error = %e, "discarding unreadable session");
                    if let Err(e) = self.storage.remove(SESSION_KEY) {
                        warn!(error = %e, "failed to remove unreadable session");
                    }
                    SessionState::Anonymous
                }
            },
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                warn!(error = %e, "session storage unreadable");
                SessionState::Anonymous
            }
        };
        &self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.state, SessionState::Loading)
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    /// `Some` persists the session, `None` logs out and clears storage.
    pub fn set(&mut self, session: Option<Session>) -> Result<(), ClientError> {
        match session {
            Some(session) => {
                self.storage
                    .set(SESSION_KEY, &serde_json::to_string(&session)?)?;
                self.state = SessionState::Authenticated(session);
            }
            None => {
                self.storage.remove(SESSION_KEY)?;
                self.state = SessionState::Anonymous;
            }
        }
        Ok(())
    }
}
