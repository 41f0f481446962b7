//! Credential store: user registration and authentication.
//!
//! Usernames are case-normalized and unique. Passwords are hashed with
//! argon2id (salted, slow) and only the PHC string is persisted; plaintext
//! never touches disk or logs. Accounts are create/authenticate only;
//! there is no update or delete surface.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use crate::subsystems::authz::Role;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, Clone)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, error::StocktakeError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| error::StocktakeError::PasswordHashError(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn accounts_db_path(root: &Path) -> PathBuf {
    root.join(schemas::ACCOUNTS_DB_NAME)
}

fn ensure_schema(conn: &Connection) -> Result<(), error::StocktakeError> {
    conn.execute(schemas::ACCOUNTS_DB_SCHEMA_META, [])?;
    conn.execute(schemas::ACCOUNTS_DB_SCHEMA_USERS, [])?;
    conn.execute(schemas::ACCOUNTS_DB_SCHEMA_PREFS, [])?;
    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::ACCOUNTS_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

pub fn initialize_accounts_db(root: &Path) -> Result<(), error::StocktakeError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&accounts_db_path(root), "stocktake", "accounts.init", |conn| {
        ensure_schema(conn)
    })
}

/// Register a new account with the default `User` role.
pub fn register(
    root: &Path,
    username: &str,
    password: &str,
) -> Result<User, error::StocktakeError> {
    register_with_role(root, username, password, Role::User)
}

/// Register a new account with an explicit role (CLI `--role`, seeding).
pub fn register_with_role(
    root: &Path,
    username: &str,
    password: &str,
    role: Role,
) -> Result<User, error::StocktakeError> {
    let username = normalize_username(username);
    if username.is_empty() {
        return Err(error::StocktakeError::ValidationError(
            "username must not be empty".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(error::StocktakeError::ValidationError(
            "password must not be empty".to_string(),
        ));
    }

    let password_hash = hash_password(password)?;
    let ts = time::now_epoch_z();
    let broker = DbBroker::new(root);

    broker.with_conn(&accounts_db_path(root), &username, "accounts.register", |conn| {
        ensure_schema(conn)?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT username FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(error::StocktakeError::RusqliteError)?;
        if existing.is_some() {
            return Err(error::StocktakeError::DuplicateUser);
        }

        conn.execute(
            "INSERT INTO users(username, password_hash, role, created_at) VALUES(?1, ?2, ?3, ?4)",
            params![username, password_hash, role.as_str(), ts],
        )?;
        // Notification preferences start fully opted out.
        conn.execute(
            "INSERT INTO prefs(username, receive_notifications, prompt_suppressed, updated_at)
             VALUES(?1, 0, 0, ?2)",
            params![username, ts],
        )?;

        Ok(User {
            username: username.clone(),
            password_hash: password_hash.clone(),
            role: role.as_str().to_string(),
            created_at: ts.clone(),
        })
    })
}

/// Authenticate a username/password pair.
///
/// Unknown username and wrong password produce the same
/// `InvalidCredentials` error.
pub fn authenticate(
    root: &Path,
    username: &str,
    password: &str,
) -> Result<User, error::StocktakeError> {
    let username = normalize_username(username);
    let user = get_user(root, &username)?.ok_or(error::StocktakeError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        return Err(error::StocktakeError::InvalidCredentials);
    }
    Ok(user)
}

pub fn get_user(root: &Path, username: &str) -> Result<Option<User>, error::StocktakeError> {
    let db_path = accounts_db_path(root);
    if !db_path.exists() {
        return Ok(None);
    }
    let conn = db::db_connect(&db_path.to_string_lossy())?;
    ensure_schema(&conn)?;
    let normalized = normalize_username(username);
    conn.query_row(
        "SELECT username, password_hash, role, created_at FROM users WHERE username = ?1",
        params![normalized],
        |row| {
            Ok(User {
                username: row.get(0)?,
                password_hash: row.get(1)?,
                role: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(error::StocktakeError::RusqliteError)
}
