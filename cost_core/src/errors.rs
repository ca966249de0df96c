//! # Error Types
//!
//! Structured error types for cost_core. Errors carry enough context for a
//! front end (or a script reading the JSON form) to tell the user what went
//! wrong and whether retrying makes sense.
//!
//! Note that bad numbers typed into a line are *not* errors: the calculators
//! coerce them to zero (see [`crate::calculations::line::sanitize_amount`]).
//!
//! ## Example
//!
//! ```rust
//! use cost_core::errors::{CostError, CostResult};
//!
//! fn require_name(name: &str) -> CostResult<()> {
//!     if name.trim().is_empty() {
//!         return Err(CostError::invalid_input("name", name, "Sheet name cannot be empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_name("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for cost_core operations
pub type CostResult<T> = Result<T, CostError>;

/// Structured error type for costing operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CostError {
    /// An input value is invalid (wrong field for the line kind, bad text, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// No costing sheet with this id exists in the store
    #[error("Costing sheet not found: {sheet_id}")]
    SheetNotFound { sheet_id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// Sheet file is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Report rendering failed
    #[error("Report error: {reason}")]
    ReportFailed { reason: String },
}

impl CostError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CostError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a SheetNotFound error
    pub fn sheet_not_found(sheet_id: impl ToString) -> Self {
        CostError::SheetNotFound {
            sheet_id: sheet_id.to_string(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CostError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        CostError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from anything displayable
    pub fn serialization(reason: impl ToString) -> Self {
        CostError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Whether the same request can reasonably be retried as is.
    ///
    /// Lock contention and I/O hiccups may clear up; bad input or a missing
    /// sheet will not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CostError::FileLocked { .. } | CostError::FileError { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CostError::InvalidInput { .. } => "INVALID_INPUT",
            CostError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            CostError::FileError { .. } => "FILE_ERROR",
            CostError::FileLocked { .. } => "FILE_LOCKED",
            CostError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CostError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CostError::ReportFailed { .. } => "REPORT_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CostError::invalid_input("quantity", "abc", "Not a number");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidInput\""));
        let roundtrip: CostError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CostError::sheet_not_found("abc").error_code(), "SHEET_NOT_FOUND");
        assert_eq!(CostError::serialization("bad").error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_recoverable() {
        assert!(CostError::file_locked("a.csf", "someone", "now").is_recoverable());
        assert!(CostError::file_error("write", "a.csf", "disk full").is_recoverable());
        assert!(!CostError::sheet_not_found("x").is_recoverable());
    }
}
