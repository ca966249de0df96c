//! # Line Totals
//!
//! Totals for a single material or labor line. Inputs come straight from
//! data-entry forms, so anything that is not a finite, non-negative number
//! counts as zero instead of raising an error. The same rule applies to
//! results: a product too large for `f64` counts as zero, so no total is
//! ever infinite or NaN.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::calculations::line::{labor_total, material_total};
//!
//! assert_eq!(material_total(10.0, 5.0), 50.0);
//! assert_eq!(labor_total(120.0, 20.0), 40.0);
//! assert_eq!(material_total(-1.0, 5.0), 0.0);
//! ```

/// Minutes in one hour, for converting standard minutes to hourly rates
pub const MINUTES_PER_HOUR: f64 = 60.0;

/// Coerce a typed-in amount to a usable one.
///
/// Negative, NaN and infinite values become `0.0`, as does `-0.0`;
/// everything else passes through unchanged.
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Material line total: quantity × unit cost.
pub fn material_total(quantity: f64, unit_cost: f64) -> f64 {
    sanitize_amount(sanitize_amount(quantity) * sanitize_amount(unit_cost))
}

/// Labor line total: (minutes / 60) × hourly rate.
pub fn labor_total(time_minutes: f64, rate_per_hour: f64) -> f64 {
    sanitize_amount((sanitize_amount(time_minutes) / MINUTES_PER_HOUR) * sanitize_amount(rate_per_hour))
}
