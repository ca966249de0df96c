//! # Costing Calculations
//!
//! Pure functions that turn line inputs into money. Nothing here holds
//! state; every figure is recomputed from the current lines on each call.
//!
//! - [`line`] - per-line totals (material, labor) and input coercion
//! - [`aggregate`] - sheet-level roll-up: overhead, tax, COGS, selling price
//!
//! ## Evaluation Order
//!
//! ```text
//! materials ─┐
//!            ├─ base cost ── overheads ─┐
//! labor ─────┘                          ├─ subtotal ── tax ── COGS ── selling price
//!                                       │
//! ```

pub mod aggregate;
pub mod line;

pub use aggregate::{calculate, BaseCost, CostSummary};
pub use line::{labor_total, material_total, sanitize_amount};
