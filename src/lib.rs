//! Stocktake: a local-first inventory tracker.
//!
//! Stocktake keeps a small inventory under version-controllable local state:
//! per-project databases, an append-only event log, and an auditable mutation
//! broker. It is a single-user CLI with multi-account credentials and
//! role-scoped access.
//!
//! # Architecture
//!
//! - **Data root** (`<project>/.stocktake/data/`): inventory and account
//!   databases, JSONL event and notification logs, the session file, and
//!   `config.toml`.
//! - **The broker**: all mutations route through [`core::broker::DbBroker`]
//!   for in-process serialization and audit logging
//!   (`broker.events.jsonl`).
//! - **Subsystems**: `accounts` (credentials), `items` (the event-sourced
//!   item store), `listing` (search, pagination, role-scoped presentation),
//!   `notify` (opt-in depletion alerts).
//!
//! # Examples
//!
//! ```bash
//! # Initialize a workspace
//! stocktake init
//!
//! # Create an admin account and sign in
//! stocktake register --username ada --password s3cret --role Admin
//! stocktake login --username ada --password s3cret
//!
//! # Work the inventory
//! stocktake item add "M4 hex bolts" --quantity 200 --code M4-HEX
//! stocktake browse --search bolt
//! stocktake item dec --id <ID>
//! ```

pub mod core;
pub mod subsystems;

use crate::core::{
    config, error, schemas,
    session::{self, Session},
    store::Store,
    time,
};
use crate::subsystems::{accounts, authz, items, listing, notify};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "stocktake",
    version = env!("CARGO_PKG_VERSION"),
    about = "Local-first inventory tracking with accounts, roles, and stock alerts"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
    /// Re-run initialization even if `.stocktake` already exists.
    #[clap(long)]
    force: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a Stocktake workspace in a project directory
    #[clap(name = "init")]
    Init(InitCli),

    /// Show version information
    #[clap(name = "version")]
    Version,

    /// Create an account
    #[clap(name = "register")]
    Register {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
        /// Role for the new account: User, Admin, or SuperUser.
        #[clap(long, default_value = "User")]
        role: String,
    },

    /// Sign in and start a session
    #[clap(name = "login")]
    Login {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
    },

    /// Sign out
    #[clap(name = "logout")]
    Logout,

    /// Show the signed-in user and their capabilities
    #[clap(name = "whoami")]
    Whoami {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage inventory items
    #[clap(name = "item", visible_alias = "i")]
    Item(items::ItemCli),

    /// Browse the inventory (search, pagination)
    #[clap(name = "browse", visible_alias = "b")]
    Browse(listing::BrowseCli),

    /// Stock alert preferences
    #[clap(name = "notify", visible_alias = "n")]
    Notify(notify::NotifyCli),
}

fn require_session(store: &Store) -> Result<Session, error::StocktakeError> {
    session::load(&store.root)?.ok_or_else(|| {
        error::StocktakeError::ValidationError(
            "not signed in. Run `stocktake login` first.".to_string(),
        )
    })
}

fn run_init(init: InitCli) -> Result<(), error::StocktakeError> {
    let target_dir = match init.dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let target_dir = fs::canonicalize(&target_dir).map_err(error::StocktakeError::IoError)?;

    let stocktake_root = target_dir.join(".stocktake");
    if stocktake_root.exists() && !init.force {
        println!(
            "{} workspace already initialized at {}",
            "✓".bright_green(),
            stocktake_root.display()
        );
        println!("  Use {} to re-run initialization.", "--force".bright_cyan());
        return Ok(());
    }

    let data_root = stocktake_root.join("data");
    fs::create_dir_all(&data_root).map_err(error::StocktakeError::IoError)?;

    subsystems::initialize_all_dbs(&data_root)?;

    // Empty event log so replay works from day one (preserve existing).
    let events_path = data_root.join(schemas::INVENTORY_EVENTS_NAME);
    if !events_path.exists() {
        fs::write(&events_path, "").map_err(error::StocktakeError::IoError)?;
    }

    let wrote_config = config::write_default_config(&data_root)?;

    println!(
        "{} initialized Stocktake workspace at {}",
        "●".bright_green(),
        stocktake_root.display()
    );
    println!("    {} {}", "●".bright_green(), schemas::INVENTORY_DB_NAME);
    println!("    {} {}", "●".bright_green(), schemas::ACCOUNTS_DB_NAME);
    println!("    {} {}", "●".bright_green(), schemas::INVENTORY_EVENTS_NAME);
    if wrote_config {
        println!("    {} {}", "●".bright_green(), schemas::CONFIG_FILE_NAME);
    } else {
        println!(
            "    {} {} {}",
            "✓".bright_green(),
            schemas::CONFIG_FILE_NAME,
            "(preserved)".bright_black()
        );
    }
    println!();
    println!(
        "  Next: {} then {}",
        "stocktake register".bright_cyan(),
        "stocktake login".bright_cyan()
    );
    Ok(())
}

pub fn run() -> Result<(), error::StocktakeError> {
    let cli = Cli::parse();

    let command = match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Init(init) => return run_init(init),
        other => other,
    };

    // Every other command runs against a discovered workspace.
    let current_dir = std::env::current_dir()?;
    let store = Store::discover(&current_dir)?;

    match command {
        Command::Register {
            username,
            password,
            role,
        } => {
            let user = accounts::register_with_role(
                &store.root,
                &username,
                &password,
                authz::Role::parse(&role),
            )?;
            println!(
                "{} registered {} ({})",
                "✓".bright_green(),
                user.username.bright_white(),
                user.role
            );
        }
        Command::Login { username, password } => {
            let user = accounts::authenticate(&store.root, &username, &password)?;
            let new_session = Session::new(&user.username, &user.role);
            session::save(&store.root, &new_session)?;
            println!(
                "{} signed in as {} ({})",
                "✓".bright_green(),
                user.username.bright_white(),
                user.role
            );
            let prefs = notify::load_prefs(&store.root, &user.username)?;
            if prefs.should_prompt() {
                println!(
                    "  Stock alerts are off. Enable with {} or silence this with {}.",
                    "stocktake notify enable".bright_cyan(),
                    "stocktake notify ack".bright_cyan()
                );
            }
        }
        Command::Logout => {
            if session::clear(&store.root)? {
                println!("{} signed out", "✓".bright_green());
            } else {
                println!("No active session.");
            }
        }
        Command::Whoami { format } => {
            let active = require_session(&store)?;
            let role = authz::Role::parse(&active.role);
            let caps = authz::capabilities(role);
            match format {
                OutputFormat::Json => {
                    let out = time::command_envelope(
                        "whoami",
                        "ok",
                        serde_json::json!({
                            "username": active.username,
                            "role": role.as_str(),
                            "capabilities": caps.to_vec(),
                        }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap());
                }
                OutputFormat::Text => {
                    let cap_names: Vec<&str> =
                        caps.to_vec().iter().map(|c| c.as_str()).collect();
                    println!(
                        "{} ({}) capabilities: {}",
                        active.username.bright_white(),
                        role.as_str(),
                        cap_names.join(", ")
                    );
                }
            }
        }
        Command::Item(item_cli) => {
            let active = require_session(&store)?;
            items::run_item_cli(&store, &active, item_cli)?;
        }
        Command::Browse(browse_cli) => {
            let active = require_session(&store)?;
            listing::run_browse_cli(&store, &active, browse_cli)?;
        }
        Command::Notify(notify_cli) => {
            let active = require_session(&store)?;
            notify::run_notify_cli(&store, &active, notify_cli)?;
        }
        Command::Init(_) | Command::Version => unreachable!(),
    }
    Ok(())
}
