use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StocktakeError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("An account with that username already exists")]
    DuplicateUser,
    // One uniform message for unknown username and wrong password alike.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Notification delivery failed: {0}")]
    NotifyFailed(String),
    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
}
