//! # cost_core - Apparel Costing Engine
//!
//! `cost_core` is the computational heart of Stitchcost: it turns a garment's
//! costing sheet (materials, labor operations, overheads, tax rates and a
//! profit margin) into cost of goods and a selling price. All inputs and
//! outputs are JSON-serializable so the engine can sit behind any API.
//!
//! ## Design Philosophy
//!
//! - **Recompute, don't cache**: totals are derived from raw line inputs on every read
//! - **Forgiving input**: negative or non-finite numbers count as zero, never an error
//! - **JSON-First**: records and summaries implement Serialize/Deserialize
//! - **Rich Errors**: structured error types for the few things that can fail (storage)
//!
//! ## Quick Start
//!
//! ```rust
//! use cost_core::lines::{FieldValue, LineField, LineKind, OverheadKind};
//! use cost_core::sheet::{CostingSheet, TaxConfiguration};
//!
//! let mut sheet = CostingSheet::new("Denim jacket FW26");
//! sheet.add_line(LineKind::Material, &[
//!     (LineField::Quantity, FieldValue::Number(10.0)),
//!     (LineField::UnitCost, FieldValue::Number(5.0)),
//! ]).unwrap();
//! sheet.add_line(LineKind::Labor, &[
//!     (LineField::TimeMinutes, FieldValue::Number(120.0)),
//!     (LineField::RatePerHour, FieldValue::Number(20.0)),
//! ]).unwrap();
//! sheet.add_line(LineKind::Overhead, &[
//!     (LineField::OverheadKind, FieldValue::OverheadKind(OverheadKind::Fixed)),
//!     (LineField::Amount, FieldValue::Number(10.0)),
//! ]).unwrap();
//! sheet.set_tax(TaxConfiguration::new(10.0, 0.0, 0.0));
//! sheet.set_profit_margin(20.0);
//!
//! let summary = sheet.summary();
//! assert_eq!(summary.subtotal, 100.0);
//! assert_eq!(summary.total_cost, 110.0);
//! ```
//!
//! ## Modules
//!
//! - [`sheet`] - Costing sheet container, tax configuration, validation
//! - [`breakdown`] - Ordered line store (add / update / remove)
//! - [`lines`] - Material, labor and overhead line types and field editing
//! - [`calculations`] - Line totals and the sheet roll-up
//! - [`currency`] - Supported currency codes
//! - [`record`] - Persisted record shape
//! - [`gateway`] - Persistence boundary (memory and directory stores)
//! - [`session`] - Unsaved / Saved / Dirty editing state machine
//! - [`file_io`] - File operations with atomic saves and locking
//! - [`pdf`] - Costing sheet PDF report
//! - [`errors`] - Structured error types

pub mod breakdown;
pub mod calculations;
pub mod currency;
pub mod errors;
pub mod file_io;
pub mod gateway;
pub mod lines;
pub mod pdf;
pub mod record;
pub mod session;
pub mod sheet;

// Re-export commonly used types at crate root for convenience
pub use breakdown::CostBreakdown;
pub use calculations::CostSummary;
pub use currency::Currency;
pub use errors::{CostError, CostResult};
pub use file_io::{load_sheet, save_sheet, FileLock};
pub use gateway::{DirectoryGateway, MemoryGateway, PersistenceGateway, SheetListing};
pub use lines::{FieldValue, LaborLine, LineField, LineKind, MaterialLine, OverheadKind, OverheadLine};
pub use record::SheetRecord;
pub use session::{EditSession, SheetState};
pub use sheet::{CostingSheet, TaxConfiguration};
