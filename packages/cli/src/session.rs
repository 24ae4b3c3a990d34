use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged-in session as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server the token was issued by.
    pub server: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session persisted as JSON on disk. Expired sessions are treated as absent.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// `<config_dir>/recipebox/session.json`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(Self::at(dir.join("recipebox").join("session.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        self.load_at(Utc::now())
    }

    fn load_at(&self, now: DateTime<Utc>) -> Result<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(_) => {
                // Unreadable sessions are as good as none.
                self.clear()?;
                return Ok(None);
            }
        };

        if session.is_expired_at(now) {
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Remove the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
