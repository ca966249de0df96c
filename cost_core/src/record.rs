//! # Sheet Records
//!
//! The plain-data shape a costing sheet takes when it crosses the
//! persistence boundary (document store, `.csf` file, API payload).
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "id": "2b4c0c1e-9a57-4b8e-8a53-2f0f0f1f5a10",
//!   "name": "Denim jacket FW26",
//!   "profitMargin": 20.0,
//!   "selectedCurrency": "USD",
//!   "costBreakdown": {
//!     "materials": [
//!       { "id": "...", "name": "Denim 12oz", "supplier": null, "quantity": 10.0,
//!         "unit": "meters", "unitCost": 5.0, "currency": "USD", "total": 50.0 }
//!     ],
//!     "labor": [
//!       { "id": "...", "operation": "Assembly", "timeMinutes": 120.0,
//!         "ratePerHour": 20.0, "currency": "USD", "total": 40.0 }
//!     ],
//!     "overheads": [
//!       { "id": "...", "category": "Utilities", "amount": 10.0,
//!         "currency": "USD", "type": "FIXED" }
//!     ]
//!   },
//!   "taxConfig": { "vatRate": 10.0, "customsDuty": 0.0, "otherTaxes": 0.0 },
//!   "createdAt": "2026-10-19T09:00:00Z",
//!   "updatedAt": "2026-10-19T09:30:00Z"
//! }
//! ```
//!
//! Material and labor `total` fields are written for readers of the record
//! only. They are recomputed every time a record is produced and ignored
//! when one is read back, so a stored total can never disagree with its
//! inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::breakdown::CostBreakdown;
use crate::currency::Currency;
use crate::lines::{LaborLine, MaterialLine, OverheadKind, OverheadLine};
use crate::sheet::{CostingSheet, TaxConfiguration, SCHEMA_VERSION};

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Stored totals are never read back, so any value (including `null`) loads.
fn ignored_total<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Persisted form of a [`CostingSheet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRecord {
    /// Schema version (for migration compatibility)
    #[serde(default = "default_version")]
    pub version: String,
    pub id: Uuid,
    pub name: String,
    pub profit_margin: f64,
    pub selected_currency: Currency,
    pub cost_breakdown: BreakdownRecord,
    pub tax_config: TaxConfiguration,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRecord {
    #[serde(default)]
    pub materials: Vec<MaterialRecord>,
    #[serde(default)]
    pub labor: Vec<LaborRecord>,
    #[serde(default)]
    pub overheads: Vec<OverheadRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub supplier: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub unit_cost: f64,
    /// Missing currency means the sheet's currency
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default, deserialize_with = "ignored_total")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborRecord {
    pub id: Uuid,
    pub operation: String,
    pub time_minutes: f64,
    pub rate_per_hour: f64,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default, deserialize_with = "ignored_total")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverheadRecord {
    pub id: Uuid,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(rename = "type", default)]
    pub kind: OverheadKind,
}

impl From<&MaterialLine> for MaterialRecord {
    fn from(line: &MaterialLine) -> Self {
        MaterialRecord {
            id: line.id,
            name: line.name.clone(),
            supplier: line.supplier.clone(),
            quantity: line.quantity,
            unit: line.unit.clone(),
            unit_cost: line.unit_cost,
            currency: Some(line.currency),
            total: line.total(),
        }
    }
}

impl From<&LaborLine> for LaborRecord {
    fn from(line: &LaborLine) -> Self {
        LaborRecord {
            id: line.id,
            operation: line.operation.clone(),
            time_minutes: line.time_minutes,
            rate_per_hour: line.rate_per_hour,
            currency: Some(line.currency),
            total: line.total(),
        }
    }
}

impl From<&OverheadLine> for OverheadRecord {
    fn from(line: &OverheadLine) -> Self {
        OverheadRecord {
            id: line.id,
            category: line.category.clone(),
            amount: line.amount,
            currency: Some(line.currency),
            kind: line.kind,
        }
    }
}

impl BreakdownRecord {
    fn into_breakdown(self, sheet_currency: Currency) -> CostBreakdown {
        CostBreakdown {
            materials: self
                .materials
                .into_iter()
                .map(|r| MaterialLine {
                    id: r.id,
                    name: r.name,
                    supplier: r.supplier,
                    quantity: r.quantity,
                    unit: r.unit,
                    unit_cost: r.unit_cost,
                    currency: r.currency.unwrap_or(sheet_currency),
                })
                .collect(),
            labor: self
                .labor
                .into_iter()
                .map(|r| LaborLine {
                    id: r.id,
                    operation: r.operation,
                    time_minutes: r.time_minutes,
                    rate_per_hour: r.rate_per_hour,
                    currency: r.currency.unwrap_or(sheet_currency),
                })
                .collect(),
            overheads: self
                .overheads
                .into_iter()
                .map(|r| OverheadLine {
                    id: r.id,
                    category: r.category,
                    amount: r.amount,
                    currency: r.currency.unwrap_or(sheet_currency),
                    kind: r.kind,
                })
                .collect(),
        }
    }
}

impl From<&CostingSheet> for SheetRecord {
    fn from(sheet: &CostingSheet) -> Self {
        let breakdown = &sheet.breakdown;
        SheetRecord {
            version: SCHEMA_VERSION.to_string(),
            id: sheet.id,
            name: sheet.name.clone(),
            profit_margin: sheet.profit_margin,
            selected_currency: sheet.currency,
            cost_breakdown: BreakdownRecord {
                materials: breakdown.materials.iter().map(MaterialRecord::from).collect(),
                labor: breakdown.labor.iter().map(LaborRecord::from).collect(),
                overheads: breakdown.overheads.iter().map(OverheadRecord::from).collect(),
            },
            tax_config: sheet.tax,
            created_at: sheet.created,
            updated_at: sheet.modified,
        }
    }
}

impl From<SheetRecord> for CostingSheet {
    fn from(record: SheetRecord) -> Self {
        let currency = record.selected_currency;
        CostingSheet {
            id: record.id,
            name: record.name,
            currency,
            profit_margin: record.profit_margin,
            tax: record.tax_config,
            created: record.created_at,
            modified: record.updated_at,
            breakdown: record.cost_breakdown.into_breakdown(currency),
        }
    }
}
