//! Explicit session context for the signed-in user.
//!
//! Login writes `session.json` into the data root; logout removes it.
//! The role is stored as the raw string from the account record and parsed
//! on demand, so an unknown or tampered value degrades to the least
//! privileged role instead of failing.

use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    pub username: String,
    pub role: String,
    pub created_at: String,
}

impl Session {
    pub fn new(username: &str, role: &str) -> Self {
        Self {
            username: username.to_string(),
            role: role.to_string(),
            created_at: time::now_epoch_z(),
        }
    }
}

pub fn session_path(root: &Path) -> PathBuf {
    root.join(schemas::SESSION_FILE_NAME)
}

pub fn save(root: &Path, session: &Session) -> Result<(), error::StocktakeError> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| error::StocktakeError::ValidationError(e.to_string()))?;
    fs::write(session_path(root), json).map_err(error::StocktakeError::IoError)?;
    Ok(())
}

/// A missing or unreadable session file means signed out.
pub fn load(root: &Path) -> Result<Option<Session>, error::StocktakeError> {
    let path = session_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(error::StocktakeError::IoError)?;
    Ok(serde_json::from_str(&raw).ok())
}

/// Tear down the session. Returns whether a session existed.
pub fn clear(root: &Path) -> Result<bool, error::StocktakeError> {
    let path = session_path(root);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).map_err(error::StocktakeError::IoError)?;
    Ok(true)
}
