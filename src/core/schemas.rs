//! Centralized database schema definitions for Stocktake's SQLite stores.
//!
//! Two databases live under the data root:
//! 1. inventory.db: the canonical item set, event-sourced via a JSONL log.
//! 2. accounts.db: user records and per-user notification preferences.

// --- Inventory ---
pub const INVENTORY_DB_NAME: &str = "inventory.db";
pub const INVENTORY_EVENTS_NAME: &str = "inventory.events.jsonl";
pub const INVENTORY_SCHEMA_VERSION: u32 = 1;

pub const INVENTORY_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const INVENTORY_DB_SCHEMA_ITEMS: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        code TEXT,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

// Codes are optional; uniqueness only applies to rows that carry one.
pub const INVENTORY_DB_SCHEMA_INDEX_CODE: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_items_code ON items(code) WHERE code IS NOT NULL";
pub const INVENTORY_DB_SCHEMA_INDEX_NAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_items_name ON items(name)";

// --- Accounts ---
pub const ACCOUNTS_DB_NAME: &str = "accounts.db";
pub const ACCOUNTS_SCHEMA_VERSION: u32 = 1;

pub const ACCOUNTS_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const ACCOUNTS_DB_SCHEMA_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'User',
        created_at TEXT NOT NULL
    )
";

pub const ACCOUNTS_DB_SCHEMA_PREFS: &str = "
    CREATE TABLE IF NOT EXISTS prefs (
        username TEXT PRIMARY KEY,
        receive_notifications INTEGER NOT NULL DEFAULT 0,
        prompt_suppressed INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(username) REFERENCES users(username) ON DELETE CASCADE
    )
";

// --- Flat files in the data root ---
pub const NOTIFICATIONS_LOG_NAME: &str = "notifications.jsonl";
pub const SESSION_FILE_NAME: &str = "session.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";
