use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};

use super::Session;

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// Where the current session lives between requests.
///
/// Every request reads the store at call time. Only login success writes it;
/// logout and a 401 response clear it.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Result<Option<Session>>;
    fn set(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;

    /// The bearer token, if a session is stored.
    fn token(&self) -> Result<Option<String>> {
        Ok(self.get()?.map(|s| s.token))
    }
}

/// Process-local store, starts empty.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<Session>> {
        let guard = self
            .session
            .read()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        Ok(guard.clone())
    }

    fn set(&self, session: &Session) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Session persisted as JSON in a cache directory, re-read on every `get`
/// so separate processes share one login.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    cache_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn read(path: &Path) -> Result<Session> {
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<Session>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn set(&self, session: &Session) -> Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}
