//! # Sheet Roll-Up
//!
//! Derives the sheet-level figures from a [`CostBreakdown`], its
//! [`TaxConfiguration`] and the profit margin. Every call recomputes from
//! the lines; nothing is cached, so the result always matches the latest
//! edit and two calls on the same inputs return the same summary.
//!
//! ## Formulas
//!
//! ```text
//! material  = Σ quantity × unit_cost
//! labor     = Σ (minutes / 60) × rate
//! base      = material + labor
//! overhead  = Σ FIXED amount  +  Σ base × PERCENTAGE amount / 100
//! subtotal  = material + labor + overhead
//! tax       = subtotal × (vat + customs + other) / 100
//! COGS      = subtotal + tax
//! price     = COGS × (1 + margin / 100)
//! ```
//!
//! Percentage overheads are all taken from the same base; they never
//! compound on one another. The three tax rates are added and applied once.
//!
//! Every figure passes through [`sanitize_amount`]: an empty sum is `+0.0`,
//! and a figure that overflows `f64` counts as zero instead of turning into
//! infinity or NaN further down the chain.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::breakdown::CostBreakdown;
//! use cost_core::calculations::aggregate::calculate;
//! use cost_core::sheet::TaxConfiguration;
//!
//! let summary = calculate(&CostBreakdown::new(), &TaxConfiguration::default(), 25.0);
//! assert_eq!(summary.selling_price, 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::breakdown::CostBreakdown;
use crate::calculations::line::sanitize_amount;
use crate::lines::{LaborLine, MaterialLine, OverheadKind, OverheadLine};
use crate::sheet::TaxConfiguration;

/// Material + labor cost: the base every percentage overhead is taken from.
///
/// A distinct type so an overhead can only ever be evaluated against this
/// base, never against a running total that already includes overheads.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseCost(pub f64);

impl BaseCost {
    /// Base cost from the material and labor sums
    pub fn new(total_material_cost: f64, total_labor_cost: f64) -> Self {
        BaseCost(sanitize_amount(total_material_cost + total_labor_cost))
    }
}

/// Derived monetary figures of a costing sheet.
///
/// ## JSON Example
///
/// ```json
/// {
///   "totalMaterialCost": 50.0,
///   "totalLaborCost": 40.0,
///   "totalOverheadCost": 10.0,
///   "subtotal": 100.0,
///   "totalTax": 10.0,
///   "totalCost": 110.0,
///   "sellingPrice": 132.0,
///   "profitAmount": 22.0
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub total_material_cost: f64,
    pub total_labor_cost: f64,
    pub total_overhead_cost: f64,
    pub subtotal: f64,
    pub total_tax: f64,
    /// Cost of goods sold: subtotal + tax
    pub total_cost: f64,
    pub selling_price: f64,
    /// selling_price - total_cost
    pub profit_amount: f64,
}

/// Sum of material line totals
pub fn total_material_cost(materials: &[MaterialLine]) -> f64 {
    sanitize_amount(materials.iter().map(MaterialLine::total).sum())
}

/// Sum of labor line totals
pub fn total_labor_cost(labor: &[LaborLine]) -> f64 {
    sanitize_amount(labor.iter().map(LaborLine::total).sum())
}

/// What one overhead line adds on top of `base`.
pub fn overhead_contribution(line: &OverheadLine, base: BaseCost) -> f64 {
    let amount = sanitize_amount(line.amount);
    match line.kind {
        OverheadKind::Fixed => amount,
        OverheadKind::Percentage => sanitize_amount(sanitize_amount(base.0) * amount / 100.0),
    }
}

/// Sum of overhead contributions, each evaluated against the same base.
pub fn total_overhead_cost(overheads: &[OverheadLine], base: BaseCost) -> f64 {
    sanitize_amount(
        overheads
            .iter()
            .map(|line| overhead_contribution(line, base))
            .sum(),
    )
}

/// Tax on `subtotal`: the three rates are summed and applied once.
pub fn total_tax(subtotal: f64, tax: &TaxConfiguration) -> f64 {
    sanitize_amount(sanitize_amount(subtotal) * tax.combined_rate() / 100.0)
}

/// COGS marked up by the profit margin percentage.
pub fn selling_price(total_cost: f64, profit_margin: f64) -> f64 {
    sanitize_amount(sanitize_amount(total_cost) * (1.0 + sanitize_amount(profit_margin) / 100.0))
}

/// Compute every derived figure of a sheet, in dependency order.
pub fn calculate(
    breakdown: &CostBreakdown,
    tax: &TaxConfiguration,
    profit_margin: f64,
) -> CostSummary {
    let total_material_cost = total_material_cost(&breakdown.materials);
    let total_labor_cost = total_labor_cost(&breakdown.labor);
    let base = BaseCost::new(total_material_cost, total_labor_cost);
    let total_overhead_cost = total_overhead_cost(&breakdown.overheads, base);
    let subtotal = sanitize_amount(total_material_cost + total_labor_cost + total_overhead_cost);
    let total_tax = total_tax(subtotal, tax);
    let total_cost = sanitize_amount(subtotal + total_tax);
    let selling_price = selling_price(total_cost, profit_margin);

    CostSummary {
        total_material_cost,
        total_labor_cost,
        total_overhead_cost,
        subtotal,
        total_tax,
        total_cost,
        selling_price,
        profit_amount: sanitize_amount(selling_price - total_cost),
    }
}
