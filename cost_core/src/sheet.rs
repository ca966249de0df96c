//! # Costing Sheet
//!
//! The `CostingSheet` struct is the root container for one garment's costing:
//! identity, currency, profit margin, tax configuration and the owned
//! [`CostBreakdown`]. Sheets serialize through [`crate::record::SheetRecord`]
//! to `.csf` files (see [`crate::file_io`]).
//!
//! ## Structure
//!
//! ```text
//! CostingSheet
//! ├── id, name, currency, created, modified
//! ├── profit_margin: f64 (percent)
//! ├── tax: TaxConfiguration (vat, customs duty, other)
//! └── breakdown: CostBreakdown
//!     ├── materials: Vec<MaterialLine>
//!     ├── labor: Vec<LaborLine>
//!     └── overheads: Vec<OverheadLine>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cost_core::lines::{FieldValue, LineField, LineKind};
//! use cost_core::sheet::{CostingSheet, TaxConfiguration};
//!
//! let mut sheet = CostingSheet::new("Denim jacket FW26");
//! sheet.add_line(LineKind::Material, &[
//!     (LineField::Quantity, FieldValue::Number(10.0)),
//!     (LineField::UnitCost, FieldValue::Number(5.0)),
//! ]).unwrap();
//! sheet.set_tax(TaxConfiguration::new(10.0, 0.0, 0.0));
//! sheet.set_profit_margin(20.0);
//!
//! let summary = sheet.summary();
//! assert_eq!(summary.total_cost, 55.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breakdown::CostBreakdown;
use crate::calculations::aggregate::{calculate, CostSummary};
use crate::calculations::line::{sanitize_amount, MINUTES_PER_HOUR};
use crate::currency::Currency;
use crate::errors::CostResult;
use crate::lines::{FieldValue, LineField, LineKind};

/// Current schema version for .csf files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Name given to sheets created from the "new sheet" action
pub const UNTITLED_SHEET_NAME: &str = "New Sheet";

/// Tax rates applied to a sheet's subtotal, in percent.
///
/// Each rate is applied to the same subtotal; they are added, not chained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxConfiguration {
    /// VAT / sales tax
    pub vat_rate: f64,
    /// Import customs duty
    pub customs_duty: f64,
    /// Any other levy
    pub other_taxes: f64,
}

impl TaxConfiguration {
    pub fn new(vat_rate: f64, customs_duty: f64, other_taxes: f64) -> Self {
        TaxConfiguration {
            vat_rate,
            customs_duty,
            other_taxes,
        }
    }

    /// Sum of the three rates, each coerced to a valid percentage first
    pub fn combined_rate(&self) -> f64 {
        sanitize_amount(
            sanitize_amount(self.vat_rate)
                + sanitize_amount(self.customs_duty)
                + sanitize_amount(self.other_taxes),
        )
    }

    /// Same rates with invalid values replaced by zero
    pub fn sanitized(&self) -> Self {
        TaxConfiguration {
            vat_rate: sanitize_amount(self.vat_rate),
            customs_duty: sanitize_amount(self.customs_duty),
            other_taxes: sanitize_amount(self.other_taxes),
        }
    }
}

/// An input the calculators will treat as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field (e.g. "materials[2].quantity")
    pub field: String,
    pub value: f64,
    pub reason: String,
}

/// One costing sheet: settings plus its line breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CostingSheet {
    pub id: Uuid,
    pub name: String,
    /// Currency new lines are entered in
    pub currency: Currency,
    /// Profit margin in percent over cost of goods
    pub profit_margin: f64,
    pub tax: TaxConfiguration,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub breakdown: CostBreakdown,
}

impl CostingSheet {
    /// Create a new, empty sheet in USD with no margin and no tax.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        CostingSheet {
            id: Uuid::new_v4(),
            name: name.into(),
            currency: Currency::default(),
            profit_margin: 0.0,
            tax: TaxConfiguration::default(),
            created: now,
            modified: now,
            breakdown: CostBreakdown::new(),
        }
    }

    /// Create an empty sheet named "New Sheet".
    pub fn untitled() -> Self {
        CostingSheet::new(UNTITLED_SHEET_NAME)
    }

    /// Copy this sheet's settings and lines into a new, independent sheet
    /// named "New Sheet". Sheet and line ids are all fresh.
    pub fn clone_as_new(&self) -> Self {
        let now = Utc::now();
        CostingSheet {
            id: Uuid::new_v4(),
            name: UNTITLED_SHEET_NAME.to_string(),
            currency: self.currency,
            profit_margin: self.profit_margin,
            tax: self.tax,
            created: now,
            modified: now,
            breakdown: self.breakdown.with_fresh_ids(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Append a line in the sheet's current currency. See
    /// [`CostBreakdown::add_line`].
    pub fn add_line(&mut self, kind: LineKind, fields: &[(LineField, FieldValue)]) -> CostResult<Uuid> {
        let id = self.breakdown.add_line(kind, self.currency, fields)?;
        tracing::debug!(sheet_id = %self.id, %kind, line_id = %id, "Added line");
        self.touch();
        Ok(id)
    }

    /// Replace one field on one line. Unknown ids are ignored (`Ok(false)`).
    pub fn update_line(
        &mut self,
        kind: LineKind,
        id: Uuid,
        field: LineField,
        value: FieldValue,
    ) -> CostResult<bool> {
        let updated = self.breakdown.update_line(kind, id, field, value)?;
        if updated {
            tracing::debug!(sheet_id = %self.id, %kind, line_id = %id, %field, "Updated line");
            self.touch();
        } else {
            tracing::debug!(sheet_id = %self.id, %kind, line_id = %id, "Update for unknown line ignored");
        }
        Ok(updated)
    }

    /// Remove a line. Unknown ids are ignored.
    pub fn remove_line(&mut self, kind: LineKind, id: Uuid) -> bool {
        let removed = self.breakdown.remove_line(kind, id);
        if removed {
            tracing::debug!(sheet_id = %self.id, %kind, line_id = %id, "Removed line");
            self.touch();
        }
        removed
    }

    /// Change the currency used for lines added from now on. Existing lines
    /// keep theirs; no conversion happens.
    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
        self.touch();
    }

    /// Set the profit margin percentage. Invalid values become zero.
    pub fn set_profit_margin(&mut self, percent: f64) {
        self.profit_margin = sanitize_amount(percent);
        self.touch();
    }

    /// Set the tax rates. Invalid values become zero.
    pub fn set_tax(&mut self, tax: TaxConfiguration) {
        self.tax = tax.sanitized();
        self.touch();
    }

    /// Rename the sheet.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Derived figures computed from the current lines and settings.
    pub fn summary(&self) -> CostSummary {
        calculate(&self.breakdown, &self.tax, self.profit_margin)
    }

    /// Lines entered in a currency other than the sheet's.
    pub fn mixed_currency_lines(&self) -> Vec<(LineKind, Uuid)> {
        self.breakdown.lines_not_in(self.currency)
    }

    /// Every stored number the calculators will coerce to zero.
    ///
    /// Edits made through this API are already clean; issues show up on
    /// sheets loaded from records written elsewhere.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut check = |field: String, value: f64| {
            if value.is_nan() || value.is_infinite() {
                issues.push(ValidationIssue {
                    field,
                    value,
                    reason: "Not a finite number; treated as 0".to_string(),
                });
            } else if value < 0.0 {
                issues.push(ValidationIssue {
                    field,
                    value,
                    reason: "Negative; treated as 0".to_string(),
                });
            }
        };

        check("profitMargin".to_string(), self.profit_margin);
        check("taxConfig.vatRate".to_string(), self.tax.vat_rate);
        check("taxConfig.customsDuty".to_string(), self.tax.customs_duty);
        check("taxConfig.otherTaxes".to_string(), self.tax.other_taxes);
        for (i, line) in self.breakdown.materials.iter().enumerate() {
            check(format!("materials[{}].quantity", i), line.quantity);
            check(format!("materials[{}].unitCost", i), line.unit_cost);
        }
        for (i, line) in self.breakdown.labor.iter().enumerate() {
            check(format!("labor[{}].timeMinutes", i), line.time_minutes);
            check(format!("labor[{}].ratePerHour", i), line.rate_per_hour);
        }
        for (i, line) in self.breakdown.overheads.iter().enumerate() {
            check(format!("overheads[{}].amount", i), line.amount);
        }

        let mut overflow = |field: String, value: f64| {
            if !value.is_finite() {
                issues.push(ValidationIssue {
                    field,
                    value,
                    reason: "Total too large to represent; treated as 0".to_string(),
                });
            }
        };
        for (i, line) in self.breakdown.materials.iter().enumerate() {
            overflow(
                format!("materials[{}].total", i),
                sanitize_amount(line.quantity) * sanitize_amount(line.unit_cost),
            );
        }
        for (i, line) in self.breakdown.labor.iter().enumerate() {
            overflow(
                format!("labor[{}].total", i),
                sanitize_amount(line.time_minutes) / MINUTES_PER_HOUR * sanitize_amount(line.rate_per_hour),
            );
        }
        issues
    }
}

impl Default for CostingSheet {
    fn default() -> Self {
        CostingSheet::untitled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::OverheadKind;

    #[test]
    fn test_sheet_creation() {
        let sheet = CostingSheet::new("Polo shirt");
        assert_eq!(sheet.name, "Polo shirt");
        assert_eq!(sheet.currency, Currency::Usd);
        assert!(sheet.breakdown.is_empty());
        assert_eq!(sheet.summary(), CostSummary::default());
    }

    #[test]
    fn test_untitled_sheet_name() {
        assert_eq!(CostingSheet::untitled().name, "New Sheet");
    }

    #[test]
    fn test_new_lines_inherit_sheet_currency() {
        let mut sheet = CostingSheet::new("Chinos");
        sheet.set_currency(Currency::Inr);
        sheet.add_line(LineKind::Labor, &[]).unwrap();
        assert_eq!(sheet.breakdown.labor[0].currency, Currency::Inr);
        assert!(sheet.mixed_currency_lines().is_empty());

        sheet.set_currency(Currency::Usd);
        assert_eq!(sheet.mixed_currency_lines().len(), 1);
    }

    #[test]
    fn test_edits_touch_modified() {
        let mut sheet = CostingSheet::new("Hoodie");
        let before = sheet.modified;
        std::thread::sleep(std::time::Duration::from_millis(5));
        sheet.add_line(LineKind::Overhead, &[]).unwrap();
        assert!(sheet.modified > before);
    }

    #[test]
    fn test_update_recomputes_summary() {
        let mut sheet = CostingSheet::new("Tee");
        let id = sheet.add_line(LineKind::Material, &[]).unwrap();
        sheet
            .update_line(LineKind::Material, id, LineField::Quantity, FieldValue::Number(4.0))
            .unwrap();
        sheet
            .update_line(LineKind::Material, id, LineField::UnitCost, FieldValue::Number(2.5))
            .unwrap();
        assert_eq!(sheet.summary().total_material_cost, 10.0);

        sheet
            .update_line(LineKind::Material, id, LineField::Quantity, FieldValue::Number(1.0))
            .unwrap();
        assert_eq!(sheet.summary().total_material_cost, 2.5);
    }

    #[test]
    fn test_clone_as_new() {
        let mut sheet = CostingSheet::new("Parka");
        sheet.set_profit_margin(30.0);
        sheet
            .add_line(
                LineKind::Overhead,
                &[
                    (LineField::OverheadKind, FieldValue::OverheadKind(OverheadKind::Fixed)),
                    (LineField::Amount, FieldValue::Number(12.0)),
                ],
            )
            .unwrap();

        let copy = sheet.clone_as_new();
        assert_ne!(copy.id, sheet.id);
        assert_eq!(copy.name, "New Sheet");
        assert_ne!(copy.breakdown.overheads[0].id, sheet.breakdown.overheads[0].id);
        assert_eq!(copy.summary(), sheet.summary());
    }

    #[test]
    fn test_setters_coerce_invalid_rates() {
        let mut sheet = CostingSheet::new("Skirt");
        sheet.set_profit_margin(-5.0);
        sheet.set_tax(TaxConfiguration::new(f64::NAN, 5.0, -1.0));
        assert_eq!(sheet.profit_margin, 0.0);
        assert_eq!(sheet.tax, TaxConfiguration::new(0.0, 5.0, 0.0));
        assert!(sheet.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_raw_negatives() {
        let mut sheet = CostingSheet::new("Imported");
        sheet.profit_margin = -10.0;
        sheet.add_line(LineKind::Material, &[]).unwrap();
        sheet.breakdown.materials[0].quantity = -2.0;

        let issues = sheet.validate();
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["profitMargin", "materials[0].quantity"]);
    }

    #[test]
    fn test_validate_reports_overflowing_totals() {
        let mut sheet = CostingSheet::new("Typo");
        sheet
            .add_line(
                LineKind::Material,
                &[
                    (LineField::Quantity, FieldValue::Number(1e200)),
                    (LineField::UnitCost, FieldValue::Number(1e200)),
                ],
            )
            .unwrap();

        let issues = sheet.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "materials[0].total");
        assert_eq!(sheet.summary().total_material_cost, 0.0);
    }
}
