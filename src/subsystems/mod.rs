//! Subsystem registration: centralizes all DB initialization functions.
//!
//! Adding a new subsystem: append one entry to `SUBSYSTEMS`.

use crate::core::error;
use std::path::Path;

pub mod accounts;
pub mod authz;
pub mod items;
pub mod listing;
pub mod notify;

pub(crate) struct SubsystemInit {
    /// Subsystem identifier (used for diagnostics).
    #[allow(dead_code)]
    pub name: &'static str,
    pub initialize_db: fn(&Path) -> Result<(), error::StocktakeError>,
}

/// All subsystems that require database initialization. Sequential
/// execution avoids SQLite contention during bootstrap.
pub(crate) const SUBSYSTEMS: &[SubsystemInit] = &[
    SubsystemInit { name: "accounts", initialize_db: accounts::initialize_accounts_db },
    SubsystemInit { name: "items", initialize_db: items::initialize_inventory_db },
];

/// Initialize all subsystem databases sequentially.
pub(crate) fn initialize_all_dbs(data_root: &Path) -> Result<(), error::StocktakeError> {
    for sub in SUBSYSTEMS {
        (sub.initialize_db)(data_root)?;
    }
    Ok(())
}
