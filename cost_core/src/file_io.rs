//! # File I/O Module
//!
//! Handles costing sheet files with safety features:
//! - **Atomic saves**: Write to .tmp, verify, rename to prevent corruption
//! - **File locking**: Prevent two people editing the same sheet on a shared drive
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Sheets are saved as `.csf` (costing sheet file) JSON documents holding a
//! [`SheetRecord`]. Lock files use the `.csf.lock` extension with metadata
//! about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cost_core::file_io::{save_sheet, load_sheet, FileLock};
//! use cost_core::sheet::CostingSheet;
//! use std::path::Path;
//!
//! let sheet = CostingSheet::new("Denim jacket");
//! let path = Path::new("denim-jacket.csf");
//!
//! // Acquire lock before saving
//! let lock = FileLock::acquire(path, "merch@company.com").unwrap();
//!
//! // Save with atomic write
//! save_sheet(&sheet, path).unwrap();
//!
//! // Lock is released when dropped
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{CostError, CostResult};
use crate::record::SheetRecord;
use crate::sheet::{CostingSheet, SCHEMA_VERSION};

/// Extension of costing sheet files
pub const SHEET_EXTENSION: &str = "csf";

/// Lock file metadata stored in .csf.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        // Shells rarely export HOSTNAME, so fall back to the kernel's name
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
            .or_else(|| fs::read_to_string("/proc/sys/kernel/hostname").ok())
            .or_else(|| fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. .lock file with metadata for user visibility
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a sheet file.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(CostError::FileLocked)` - Another process holds the lock
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CostResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    tracing::warn!(
                        path = %path.display(),
                        locked_by = %existing.user_id,
                        "Sheet is locked by another user"
                    );
                    return Err(CostError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                tracing::info!(path = %path.display(), stale_owner = %existing.user_id, "Taking over stale lock");
            }
        }

        // Not truncated yet: a losing process must not wipe the holder's details
        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                CostError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        // Non-blocking: a second process gets FileLocked instead of waiting
        lock_file.try_lock_exclusive().map_err(|_| {
            CostError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(CostError::serialization)?;

        lock_file.set_len(0).map_err(|e| {
            CostError::file_error("truncate lock", lock_path.display().to_string(), e.to_string())
        })?;

        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            CostError::file_error("write lock", lock_path.display().to_string(), e.to_string())
        })?;

        lock_file.sync_all().map_err(|e| {
            CostError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        Ok(FileLock {
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` if locked, `None` if available.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Lock file path for a sheet file (`x.csf` → `x.csf.lock`)
pub(crate) fn lock_path_for(sheet_path: &Path) -> PathBuf {
    let mut lock_path = sheet_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn read_lock_info(lock_path: &Path) -> CostResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    serde_json::from_str(&contents).map_err(CostError::serialization)
}

/// A lock is stale when its process is gone (same machine) or it is over a day old.
fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    let age = Utc::now() - info.locked_at;
    age.num_hours() > 24
}

fn read_to_string(path: &Path, operation: &str) -> CostResult<String> {
    let mut file = File::open(path)
        .map_err(|e| CostError::file_error(operation, path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CostError::file_error(operation, path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Save a sheet to a file with atomic write semantics.
///
/// The save process:
/// 1. Convert to a [`SheetRecord`] (line totals recomputed) and serialize
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp to .csf (atomic on most filesystems)
///
/// On failure the previous file, if any, is left as it was.
pub fn save_sheet(sheet: &CostingSheet, path: &Path) -> CostResult<()> {
    save_record(&SheetRecord::from(sheet), path)
}

/// Write an already-built record atomically. See [`save_sheet`].
pub fn save_record(record: &SheetRecord, path: &Path) -> CostResult<()> {
    let json = serde_json::to_string_pretty(record).map_err(CostError::serialization)?;

    let tmp_path = path.with_extension(format!("{}.tmp", SHEET_EXTENSION));

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CostError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CostError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CostError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CostError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::debug!(path = %path.display(), bytes = json.len(), "Wrote sheet file");
    Ok(())
}

/// Load a sheet record from a file, validating its schema version.
///
/// # Returns
///
/// * `Ok(SheetRecord)` - Successfully loaded record
/// * `Err(CostError::VersionMismatch)` - File version is incompatible
/// * `Err(CostError::SerializationError)` - Invalid JSON
/// * `Err(CostError::FileError)` - I/O error
pub fn load_record(path: &Path) -> CostResult<SheetRecord> {
    let contents = read_to_string(path, "read")?;

    let record: SheetRecord = serde_json::from_str(&contents).map_err(|e| {
        CostError::serialization(format!("Invalid JSON in {}: {}", path.display(), e))
    })?;

    validate_version(&record.version)?;

    Ok(record)
}

/// Load a sheet from a file. Line totals stored in the file are ignored.
pub fn load_sheet(path: &Path) -> CostResult<CostingSheet> {
    load_record(path).map(CostingSheet::from)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> CostResult<()> {
    let mismatch = || CostError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions, a newer minor version may contain breaking changes
    if current_parts[0] == 0
        && file_parts.len() > 1
        && current_parts.len() > 1
        && file_parts[1] > current_parts[1]
    {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{FieldValue, LineField, LineKind};
    use tempfile::TempDir;

    fn sheet_path(dir: &TempDir, name: &str) -> PathBuf {
        dir.path().join(format!("{}.{}", name, SHEET_EXTENSION))
    }

    #[test]
    fn test_lock_path_generation() {
        let sheet_path = Path::new("/path/to/jacket.csf");
        let lock_path = lock_path_for(sheet_path);
        assert_eq!(lock_path, Path::new("/path/to/jacket.csf.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test@example.com");
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = sheet_path(&dir, "roundtrip");

        let mut sheet = CostingSheet::new("Roundtrip");
        sheet
            .add_line(
                LineKind::Material,
                &[
                    (LineField::Quantity, FieldValue::Number(3.0)),
                    (LineField::UnitCost, FieldValue::Number(4.0)),
                ],
            )
            .unwrap();
        save_sheet(&sheet, &path).unwrap();

        let loaded = load_sheet(&path).unwrap();
        assert_eq!(loaded.name, "Roundtrip");
        assert_eq!(loaded.summary(), sheet.summary());
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = sheet_path(&dir, "atomic");
        let tmp_path = path.with_extension("csf.tmp");

        save_sheet(&CostingSheet::new("Atomic"), &path).unwrap();

        assert!(!tmp_path.exists());
        assert!(path.exists());
    }

    #[test]
    fn test_load_missing_file_is_file_error() {
        let dir = TempDir::new().unwrap();
        let err = load_sheet(&sheet_path(&dir, "missing")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = sheet_path(&dir, "future");
        let mut record = SheetRecord::from(&CostingSheet::new("Future"));
        record.version = "0.9.0".to_string();
        save_record(&record, &path).unwrap();

        let err = load_sheet(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = sheet_path(&dir, "lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_failed_acquire_keeps_holder_details() {
        let dir = TempDir::new().unwrap();
        let path = sheet_path(&dir, "contended");
        let _held = FileLock::acquire(&path, "first@example.com").unwrap();

        // Metadata looks abandoned, but the OS lock is still held
        let mut old = LockInfo::new("first@example.com");
        old.machine = "elsewhere".to_string();
        old.locked_at = Utc::now() - chrono::Duration::days(2);
        fs::write(lock_path_for(&path), serde_json::to_string(&old).unwrap()).unwrap();

        let err = FileLock::acquire(&path, "second@example.com").unwrap_err();
        assert_eq!(err.error_code(), "FILE_LOCKED");

        let kept = read_lock_info(&lock_path_for(&path)).unwrap();
        assert_eq!(kept.user_id, "first@example.com");
        assert_eq!(kept.machine, "elsewhere");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lock_left_by_dead_process_is_stale() {
        assert!(hostname().is_some());

        let mut info = LockInfo::new("gone@example.com");
        info.pid = u32::MAX;
        assert!(is_lock_stale(&info));

        assert!(!is_lock_stale(&LockInfo::new("alive@example.com")));
    }
}
