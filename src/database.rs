//! Item table lookup.
//!
//! The database is a UTF-8 CSV file whose first row is a header. Column 0 holds the item name and
//! column 5 the rarity / reroll chance display string. The file is re-read on every lookup so
//! edits made while the tool is running take effect on the next hotkey press.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

const NAME_COLUMN: usize = 0;
const RARITY_COLUMN: usize = 5;
const MIN_COLUMNS: usize = RARITY_COLUMN + 1;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result of a successful scan of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// Raw value of the rarity column of the first matching row.
    Found(String),
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ItemDatabase {
    path: PathBuf,
}

impl ItemDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the backing file exists. Used for the startup warning only; lookups do
    /// not depend on it.
    pub fn verify(&self) -> bool {
        let exists = self.path.is_file();
        if !exists {
            warn!(path = %self.path.display(), "Database file not found");
        }
        exists
    }

    /// Finds the rarity value for `item_name`. Both sides are uppercased before comparing, so `ß`
    /// in the table matches `SS` from OCR.
    ///
    /// Rows with fewer than six columns are skipped. The earliest matching row wins. A match whose
    /// rarity column is empty is reported as [`LookupResult::NotFound`]. An empty name never
    /// matches and does not touch the file.
    pub fn lookup(&self, item_name: &str) -> Result<LookupResult, DatabaseError> {
        if item_name.is_empty() {
            return Ok(LookupResult::NotFound);
        }
        if !self.path.exists() {
            return Err(DatabaseError::NotFound(self.path.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let wanted = item_name.to_uppercase();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() < MIN_COLUMNS {
                debug!(row = index + 1, columns = record.len(), "Skipping short row");
                continue;
            }
            if record[NAME_COLUMN].to_uppercase() != wanted {
                continue;
            }

            let rarity = &record[RARITY_COLUMN];
            info!(item = item_name, row = index + 1, rarity, "Item found in database");
            if rarity.is_empty() {
                return Ok(LookupResult::NotFound);
            }
            return Ok(LookupResult::Found(rarity.to_string()));
        }

        debug!(item = item_name, "Item not in database");
        Ok(LookupResult::NotFound)
    }
}
