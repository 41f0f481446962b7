//! Store handle for a Stocktake data root.

use crate::core::error;
use std::path::{Path, PathBuf};

/// Handle to a Stocktake workspace.
///
/// A Store is the logical container for the inventory and account databases,
/// the JSONL logs, the session file, and the config file. All subsystem
/// state is scoped to a store's root directory (`<project>/.stocktake/data`).
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the data root directory.
    pub root: PathBuf,
}

impl Store {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk up from `start` looking for a `.stocktake` directory.
    pub fn discover(start: &Path) -> Result<Self, error::StocktakeError> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(".stocktake").join("data");
            if candidate.is_dir() {
                return Ok(Self { root: candidate });
            }
            if !current.pop() {
                return Err(error::StocktakeError::NotFound(
                    "'.stocktake' directory not found in current or parent directories. Run `stocktake init` first.".to_string(),
                ));
            }
        }
    }
}
