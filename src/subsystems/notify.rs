//! Notification gate for stock-depletion alerts.
//!
//! Alerts are strictly opt-in per user. A recorded "don't ask me again"
//! acknowledgment suppresses future opt-in prompts without turning alerts
//! on. Delivery goes through an injected channel; the default channel
//! journals to `notifications.jsonl` in the data root, and the actual
//! transport (SMS, push) stays outside this crate. Channel failure is
//! surfaced to the caller but never rolls back the inventory mutation that
//! triggered it.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::output;
use crate::core::schemas;
use crate::core::session::Session;
use crate::core::store::Store;
use crate::core::time;
use crate::subsystems::accounts;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "notify", about = "Manage stock alert preferences.")]
pub struct NotifyCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: NotifyCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    /// Show the signed-in user's alert preferences and recent deliveries.
    Status,
    /// Opt in to stock-depletion alerts.
    Enable,
    /// Opt out of stock-depletion alerts.
    Disable,
    /// Record "don't ask me again" (suppresses opt-in prompts, leaves
    /// alerts off).
    Ack,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifyPrefs {
    pub receive_notifications: bool,
    pub prompt_suppressed: bool,
}

impl NotifyPrefs {
    /// True only when the user explicitly opted in.
    pub fn should_notify(&self) -> bool {
        self.receive_notifications
    }

    /// Whether a UI should still offer the opt-in prompt.
    pub fn should_prompt(&self) -> bool {
        !self.receive_notifications && !self.prompt_suppressed
    }
}

/// Outward delivery seam. Implementations own the transport.
pub trait NotifyChannel {
    fn send(&self, recipient: &str, message: &str) -> Result<(), error::StocktakeError>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct NotificationRecord {
    ts: String,
    event_id: String,
    recipient: String,
    message: String,
}

/// Default channel: appends each alert to `notifications.jsonl`.
pub struct JournalChannel<'a> {
    root: &'a Path,
}

impl<'a> JournalChannel<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }
}

impl NotifyChannel for JournalChannel<'_> {
    fn send(&self, recipient: &str, message: &str) -> Result<(), error::StocktakeError> {
        let record = NotificationRecord {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            recipient: recipient.to_string(),
            message: message.to_string(),
        };
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(journal_path(self.root))
            .map_err(|e| error::StocktakeError::NotifyFailed(e.to_string()))?;
        writeln!(f, "{}", serde_json::to_string(&record).unwrap())
            .map_err(|e| error::StocktakeError::NotifyFailed(e.to_string()))?;
        Ok(())
    }
}

pub fn journal_path(root: &Path) -> PathBuf {
    root.join(schemas::NOTIFICATIONS_LOG_NAME)
}

/// Decides whether a depletion event becomes an outward message, and emits
/// it when it does.
pub struct NotificationGate<'a> {
    channel: &'a dyn NotifyChannel,
    recipient: String,
    prefs: NotifyPrefs,
}

impl<'a> NotificationGate<'a> {
    pub fn new(channel: &'a dyn NotifyChannel, recipient: &str, prefs: NotifyPrefs) -> Self {
        Self {
            channel,
            recipient: recipient.to_string(),
            prefs,
        }
    }

    pub fn should_notify(&self) -> bool {
        self.prefs.should_notify()
    }

    /// Emit one "out of stock" message for the named item.
    pub fn notify(&self, item_name: &str) -> Result<(), error::StocktakeError> {
        let message = format!("Inventory alert: \"{}\" is out of stock.", item_name);
        self.channel.send(&self.recipient, &message)
    }
}

/// Load preferences for a user; a missing row means fully opted out.
pub fn load_prefs(root: &Path, username: &str) -> Result<NotifyPrefs, error::StocktakeError> {
    let db_path = accounts::accounts_db_path(root);
    if !db_path.exists() {
        return Ok(NotifyPrefs::default());
    }
    let conn = db::db_connect(&db_path.to_string_lossy())?;
    let normalized = accounts::normalize_username(username);
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT receive_notifications, prompt_suppressed FROM prefs WHERE username = ?1",
            params![normalized],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(error::StocktakeError::RusqliteError)?;
    Ok(match row {
        Some((receive, suppressed)) => NotifyPrefs {
            receive_notifications: receive != 0,
            prompt_suppressed: suppressed != 0,
        },
        None => NotifyPrefs::default(),
    })
}

pub fn save_prefs(
    root: &Path,
    username: &str,
    prefs: &NotifyPrefs,
) -> Result<(), error::StocktakeError> {
    let normalized = accounts::normalize_username(username);
    let ts = time::now_epoch_z();
    let broker = DbBroker::new(root);
    broker.with_conn(
        &accounts::accounts_db_path(root),
        &normalized,
        "notify.save_prefs",
        |conn| {
            conn.execute(
                "INSERT INTO prefs(username, receive_notifications, prompt_suppressed, updated_at)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(username) DO UPDATE SET
                     receive_notifications=excluded.receive_notifications,
                     prompt_suppressed=excluded.prompt_suppressed,
                     updated_at=excluded.updated_at",
                params![
                    normalized,
                    prefs.receive_notifications as i64,
                    prefs.prompt_suppressed as i64,
                    ts
                ],
            )?;
            Ok(())
        },
    )
}

/// Most recent journal messages, newest last.
pub fn recent_journal(root: &Path, max: usize) -> Result<Vec<String>, error::StocktakeError> {
    let path = journal_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(&path).map_err(error::StocktakeError::IoError)?;
    let mut messages = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(error::StocktakeError::IoError)?;
        if let Ok(record) = serde_json::from_str::<NotificationRecord>(&line) {
            messages.push(record.message);
        }
    }
    let skip = messages.len().saturating_sub(max);
    Ok(messages.split_off(skip))
}

pub fn run_notify_cli(
    store: &Store,
    session: &Session,
    cli: NotifyCli,
) -> Result<(), error::StocktakeError> {
    let root = &store.root;
    let username = &session.username;
    let mut prefs = load_prefs(root, username)?;

    let out = match &cli.command {
        NotifyCommand::Status => {
            let recent = recent_journal(root, 3)?;
            time::command_envelope(
                "notify.status",
                "ok",
                serde_json::json!({
                    "username": username,
                    "prefs": prefs,
                    "recent": recent,
                }),
            )
        }
        NotifyCommand::Enable => {
            prefs.receive_notifications = true;
            save_prefs(root, username, &prefs)?;
            time::command_envelope("notify.enable", "ok", serde_json::json!({ "prefs": prefs }))
        }
        NotifyCommand::Disable => {
            prefs.receive_notifications = false;
            save_prefs(root, username, &prefs)?;
            time::command_envelope("notify.disable", "ok", serde_json::json!({ "prefs": prefs }))
        }
        NotifyCommand::Ack => {
            prefs.prompt_suppressed = true;
            save_prefs(root, username, &prefs)?;
            time::command_envelope("notify.ack", "ok", serde_json::json!({ "prefs": prefs }))
        }
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => match &cli.command {
            NotifyCommand::Status => {
                let on = prefs.receive_notifications;
                println!(
                    "Stock alerts for {}: {}",
                    username,
                    if on { "enabled".green() } else { "disabled".yellow() }
                );
                if prefs.prompt_suppressed {
                    println!("Opt-in prompts are suppressed (ack recorded).");
                }
                let recent = recent_journal(root, 3)?;
                if !recent.is_empty() {
                    println!("Recent: {}", output::preview_messages(&recent, 3, 60));
                }
            }
            NotifyCommand::Enable => println!("{} stock alerts enabled", "✓".green()),
            NotifyCommand::Disable => println!("{} stock alerts disabled", "✓".green()),
            NotifyCommand::Ack => {
                println!("{} opt-in prompt suppressed; alerts remain off", "✓".green())
            }
        },
    }
    Ok(())
}
