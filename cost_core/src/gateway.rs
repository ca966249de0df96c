//! # Persistence Gateway
//!
//! The boundary between the costing engine and wherever sheets are stored.
//! The engine only hands over and receives [`SheetRecord`]s; it never
//! retries, and a failed call leaves the caller's in-memory sheet alone.
//!
//! Two stores ship with the crate:
//!
//! - [`MemoryGateway`] - a map in memory, for tests and embedding
//! - [`DirectoryGateway`] - one `.csf` file per sheet in a directory,
//!   written atomically under a [`FileLock`]
//!
//! ## Example
//!
//! ```rust
//! use cost_core::gateway::{MemoryGateway, PersistenceGateway};
//! use cost_core::record::SheetRecord;
//! use cost_core::sheet::CostingSheet;
//!
//! let mut store = MemoryGateway::new();
//! let sheet = CostingSheet::new("Polo");
//! store.save(&SheetRecord::from(&sheet)).unwrap();
//!
//! assert_eq!(store.list().unwrap()[0].name, "Polo");
//! store.delete(sheet.id).unwrap();
//! assert!(store.delete(sheet.id).is_err());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Currency;
use crate::errors::{CostError, CostResult};
use crate::file_io::{load_record, save_record, FileLock, LockInfo, SHEET_EXTENSION};
use crate::record::SheetRecord;
use crate::sheet::CostingSheet;

/// One row of a sheet catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetListing {
    pub id: Uuid,
    pub name: String,
    pub currency: Currency,
    pub updated_at: DateTime<Utc>,
    pub selling_price: f64,
}

impl From<&SheetRecord> for SheetListing {
    fn from(record: &SheetRecord) -> Self {
        let selling_price = CostingSheet::from(record.clone()).summary().selling_price;
        SheetListing {
            id: record.id,
            name: record.name.clone(),
            currency: record.selected_currency,
            updated_at: record.updated_at,
            selling_price,
        }
    }
}

/// Load/save/delete costing sheets as records.
pub trait PersistenceGateway {
    /// Fetch a stored sheet. `SheetNotFound` if there is none with this id.
    fn load(&self, id: Uuid) -> CostResult<SheetRecord>;

    /// Create or replace the sheet with `record.id`.
    fn save(&mut self, record: &SheetRecord) -> CostResult<()>;

    /// Remove a sheet and its breakdown. `SheetNotFound` if absent.
    fn delete(&mut self, id: Uuid) -> CostResult<()>;

    /// All stored sheets, sorted by name.
    fn list(&self) -> CostResult<Vec<SheetListing>>;
}

fn sort_listings(listings: &mut [SheetListing]) {
    listings.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
}

/// In-memory sheet store.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    sheets: BTreeMap<Uuid, SheetRecord>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    /// Number of stored sheets
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self, id: Uuid) -> CostResult<SheetRecord> {
        self.sheets
            .get(&id)
            .cloned()
            .ok_or_else(|| CostError::sheet_not_found(id))
    }

    fn save(&mut self, record: &SheetRecord) -> CostResult<()> {
        self.sheets.insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> CostResult<()> {
        self.sheets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CostError::sheet_not_found(id))
    }

    fn list(&self) -> CostResult<Vec<SheetListing>> {
        let mut listings: Vec<SheetListing> = self.sheets.values().map(SheetListing::from).collect();
        sort_listings(&mut listings);
        Ok(listings)
    }
}

/// Sheet store backed by a directory of `<id>.csf` files.
///
/// Each write takes the sheet's lock for its duration, so a second process
/// writing the same sheet fails with `FileLocked` instead of interleaving.
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    dir: PathBuf,
    user_id: String,
}

impl DirectoryGateway {
    /// Open (and create if needed) a sheet directory. `user_id` is recorded
    /// in lock files while this gateway writes.
    pub fn open(dir: impl Into<PathBuf>, user_id: impl Into<String>) -> CostResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CostError::file_error("create directory", dir.display().to_string(), e.to_string())
        })?;
        Ok(DirectoryGateway {
            dir,
            user_id: user_id.into(),
        })
    }

    /// Directory holding the sheet files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of the sheet with this id
    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, SHEET_EXTENSION))
    }

    /// Who is writing this sheet right now, if anyone.
    pub fn lock_holder(&self, id: Uuid) -> Option<LockInfo> {
        FileLock::check(&self.path_for(id))
    }
}

/// A file must hold the sheet its name says; a copied file would otherwise
/// be saved back under a different name.
fn check_file_id(record: &SheetRecord, expected: Uuid, path: &Path) -> CostResult<()> {
    if record.id != expected {
        return Err(CostError::serialization(format!(
            "{} holds sheet {}, expected {}",
            path.display(),
            record.id,
            expected
        )));
    }
    Ok(())
}

impl PersistenceGateway for DirectoryGateway {
    fn load(&self, id: Uuid) -> CostResult<SheetRecord> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(CostError::sheet_not_found(id));
        }
        let record = load_record(&path)?;
        check_file_id(&record, id, &path)?;
        tracing::info!(sheet_id = %id, path = %path.display(), "Loaded sheet");
        Ok(record)
    }

    fn save(&mut self, record: &SheetRecord) -> CostResult<()> {
        let path = self.path_for(record.id);
        let _lock = FileLock::acquire(&path, self.user_id.as_str())?;
        save_record(record, &path)?;
        tracing::info!(sheet_id = %record.id, name = %record.name, "Saved sheet");
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> CostResult<()> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(CostError::sheet_not_found(id));
        }
        let _lock = FileLock::acquire(&path, self.user_id.as_str())?;
        fs::remove_file(&path).map_err(|e| {
            CostError::file_error("delete", path.display().to_string(), e.to_string())
        })?;
        tracing::info!(sheet_id = %id, "Deleted sheet");
        Ok(())
    }

    fn list(&self) -> CostResult<Vec<SheetListing>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            CostError::file_error("list", self.dir.display().to_string(), e.to_string())
        })?;

        let mut listings = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some(SHEET_EXTENSION) {
                continue;
            }
            let expected = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok());
            let loaded = load_record(&path).and_then(|record| match expected {
                Some(id) => check_file_id(&record, id, &path).map(|_| record),
                None => Err(CostError::serialization(format!(
                    "{} is not named after a sheet id",
                    path.display()
                ))),
            });
            match loaded {
                Ok(record) => listings.push(SheetListing::from(&record)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable sheet"),
            }
        }
        sort_listings(&mut listings);
        Ok(listings)
    }
}
