//! List controller: the searchable, paginated, role-scoped view over the
//! item store.
//!
//! The controller owns only derived, recomputable state: the last snapshot
//! pulled from the backend plus the current search term and page window.
//! Filtering is a case-insensitive substring match over names; changing the
//! search term resets to page 1, while changing the page size only re-clamps
//! bounds on the next presentation. Quantity adjustments route through the
//! backend and evaluate the notification gate when an item lands on zero.

use crate::core::config;
use crate::core::error;
use crate::core::session::Session;
use crate::core::store::Store;
use crate::core::time;
use crate::subsystems::authz::{self, Capability, Role};
use crate::subsystems::items::{self, Item};
use crate::subsystems::notify::NotificationGate;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

/// Persistence seam the controller reads and writes through. The local
/// sqlite store is the shipped implementation; a remote API client maps
/// onto the same contract.
pub trait InventoryBackend {
    /// Full current snapshot of the item set.
    fn snapshot(&self) -> Result<Vec<Item>, error::StocktakeError>;
    fn fetch(&self, id: &str) -> Result<Option<Item>, error::StocktakeError>;
    fn store_quantity(&self, id: &str, quantity: i64) -> Result<Item, error::StocktakeError>;
}

/// Backend over the local sqlite item store.
pub struct SqliteBackend<'a> {
    root: &'a Path,
    actor: String,
}

impl<'a> SqliteBackend<'a> {
    pub fn new(root: &'a Path, actor: &str) -> Self {
        Self {
            root,
            actor: actor.to_string(),
        }
    }
}

impl InventoryBackend for SqliteBackend<'_> {
    fn snapshot(&self) -> Result<Vec<Item>, error::StocktakeError> {
        items::list_items(self.root)
            .map_err(|e| error::StocktakeError::BackendUnavailable(e.to_string()))
    }

    fn fetch(&self, id: &str) -> Result<Option<Item>, error::StocktakeError> {
        items::get_item(self.root, id)
    }

    fn store_quantity(&self, id: &str, quantity: i64) -> Result<Item, error::StocktakeError> {
        items::set_quantity(self.root, &self.actor, id, quantity)
    }
}

/// One row of a presented page: the item plus the actions the current role
/// may take on it. The display layer does no authorization logic.
#[derive(Serialize, Debug, Clone)]
pub struct ListEntry {
    pub item: Item,
    pub actions: Vec<Capability>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ListPage {
    pub entries: Vec<ListEntry>,
    pub capabilities: Vec<Capability>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_filtered: usize,
    pub total_pages: usize,
    pub can_go_next: bool,
    pub can_go_prev: bool,
    /// True when the filtered set is empty, regardless of the full set.
    pub empty: bool,
}

/// Result of an increment/decrement, including what the notification gate
/// did about it.
#[derive(Serialize, Debug, Clone)]
pub struct AdjustOutcome {
    pub item: Item,
    /// Decrement at zero: quantity unchanged, caller shows the
    /// "cannot go below zero" signal.
    pub clamped: bool,
    /// The mutation landed the quantity on exactly zero.
    pub depleted: bool,
    pub notified: bool,
    pub notify_error: Option<String>,
}

pub struct ListController {
    full_set: Vec<Item>,
    search_term: String,
    page_index: usize,
    page_size: usize,
}

impl ListController {
    pub fn new(page_size: usize) -> Self {
        Self {
            full_set: Vec::new(),
            search_term: String::new(),
            page_index: 1,
            page_size: page_size.max(1),
        }
    }

    /// Replace the snapshot from the backend. On failure the last-known
    /// set stays presented and the error is surfaced to the caller.
    pub fn refresh(&mut self, backend: &dyn InventoryBackend) -> Result<(), error::StocktakeError> {
        let items = backend.snapshot()?;
        self.full_set = items;
        Ok(())
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Changing the search term always resets to the first page.
    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.page_index = 1;
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Jump to a page; out-of-range values are clamped on the next
    /// presentation.
    pub fn set_page_index(&mut self, index: usize) {
        self.page_index = index.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the page size does not reset the page index.
    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
    }

    /// Case-insensitive substring filter over names; the empty term
    /// matches everything.
    fn filtered(&self) -> Vec<&Item> {
        let needle = self.search_term.to_lowercase();
        self.full_set
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }

    fn total_pages(&self, filtered_len: usize) -> usize {
        filtered_len.div_ceil(self.page_size)
    }

    fn effective_index(&self, filtered_len: usize) -> usize {
        self.page_index.min(self.total_pages(filtered_len).max(1))
    }

    pub fn can_go_next(&self) -> bool {
        let len = self.filtered().len();
        self.effective_index(len) * self.page_size < len
    }

    pub fn can_go_prev(&self) -> bool {
        self.effective_index(self.filtered().len()) > 1
    }

    pub fn next_page(&mut self) -> bool {
        let len = self.filtered().len();
        self.page_index = self.effective_index(len);
        if self.page_index * self.page_size < len {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        let len = self.filtered().len();
        self.page_index = self.effective_index(len);
        if self.page_index > 1 {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    /// Present the current page for a role: the slice plus action
    /// affordances, pagination bounds, and the empty signal.
    pub fn present(&self, role: Role) -> ListPage {
        let caps = authz::capabilities(role);
        let filtered = self.filtered();
        let total_filtered = filtered.len();
        let total_pages = self.total_pages(total_filtered);
        let index = self.effective_index(total_filtered);

        let start = (index - 1) * self.page_size;
        let end = (index * self.page_size).min(total_filtered);
        let entries = filtered
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|item| ListEntry {
                item: (*item).clone(),
                actions: caps.row_actions(),
            })
            .collect();

        ListPage {
            entries,
            capabilities: caps.to_vec(),
            page_index: index,
            page_size: self.page_size,
            total_filtered,
            total_pages,
            can_go_next: index * self.page_size < total_filtered,
            can_go_prev: index > 1,
            empty: total_filtered == 0,
        }
    }

    pub fn increment(
        &mut self,
        backend: &dyn InventoryBackend,
        gate: &NotificationGate<'_>,
        id: &str,
    ) -> Result<AdjustOutcome, error::StocktakeError> {
        self.adjust(backend, gate, id, 1)
    }

    pub fn decrement(
        &mut self,
        backend: &dyn InventoryBackend,
        gate: &NotificationGate<'_>,
        id: &str,
    ) -> Result<AdjustOutcome, error::StocktakeError> {
        self.adjust(backend, gate, id, -1)
    }

    fn adjust(
        &mut self,
        backend: &dyn InventoryBackend,
        gate: &NotificationGate<'_>,
        id: &str,
        delta: i64,
    ) -> Result<AdjustOutcome, error::StocktakeError> {
        let current = backend
            .fetch(id)?
            .ok_or_else(|| error::StocktakeError::NotFound(format!("no item with id '{}'", id)))?;

        // Decrement floors at zero: no write, no error, just the signal.
        if delta < 0 && current.quantity == 0 {
            return Ok(AdjustOutcome {
                item: current,
                clamped: true,
                depleted: false,
                notified: false,
                notify_error: None,
            });
        }

        let updated = backend.store_quantity(id, current.quantity + delta)?;
        let depleted = updated.quantity == 0;

        let (notified, notify_error) = if depleted && gate.should_notify() {
            match gate.notify(&updated.name) {
                Ok(()) => (true, None),
                // Delivery failure never unwinds the committed mutation.
                Err(e) => (false, Some(e.to_string())),
            }
        } else {
            (false, None)
        };

        // Refresh after a successful mutation; on failure the view keeps
        // the last-known set.
        if let Ok(items) = backend.snapshot() {
            self.full_set = items;
        }

        Ok(AdjustOutcome {
            item: updated,
            clamped: false,
            depleted,
            notified,
            notify_error,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "browse",
    about = "Browse the inventory: filtered, paginated, role-scoped."
)]
pub struct BrowseCli {
    /// Output format.
    #[clap(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Case-insensitive name filter.
    #[clap(long, default_value = "")]
    search: String,
    #[clap(long, default_value = "1")]
    page: usize,
    /// Overrides the configured default page size.
    #[clap(long)]
    page_size: Option<usize>,
}

pub fn run_browse_cli(
    store: &Store,
    session: &Session,
    cli: BrowseCli,
) -> Result<(), error::StocktakeError> {
    let root = &store.root;
    let role = Role::parse(&session.role);
    if !authz::capabilities(role).allows(Capability::View) {
        return Err(error::StocktakeError::Forbidden(format!(
            "the {} role does not have the View capability",
            role.as_str()
        )));
    }

    let cfg = config::load_config(root)?;
    let backend = SqliteBackend::new(root, &session.username);
    let mut controller = ListController::new(cli.page_size.unwrap_or(cfg.default_page_size));
    controller.refresh(&backend)?;
    controller.set_search_term(&cli.search);
    controller.set_page_index(cli.page);

    let page = controller.present(role);

    match cli.format {
        OutputFormat::Json => {
            let out = time::command_envelope("browse", "ok", serde_json::json!({ "page": page }));
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => {
            if page.empty {
                println!("{}", "No items match.".yellow());
                return Ok(());
            }
            for entry in &page.entries {
                let code = entry.item.code.as_deref().unwrap_or("-");
                let actions = if entry.actions.is_empty() {
                    "view only".to_string()
                } else {
                    entry
                        .actions
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join("/")
                };
                println!(
                    "- {} [{}] qty {} {} ({})",
                    entry.item.id,
                    code,
                    entry.item.quantity,
                    crate::core::output::compact_line(&entry.item.name, 48),
                    actions
                );
            }
            println!(
                "page {}/{} ({} items){}{}",
                page.page_index,
                page.total_pages,
                page.total_filtered,
                if page.can_go_prev { " <prev" } else { "" },
                if page.can_go_next { " next>" } else { "" },
            );
            if page.capabilities.contains(&Capability::Add) {
                println!("{}", "You can add items with `stocktake item add`.".dimmed());
            }
        }
    }
    Ok(())
}
