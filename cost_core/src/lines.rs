//! # Line Items
//!
//! The three kinds of line a costing sheet breakdown holds:
//!
//! - [`MaterialLine`] - fabric, trims, labels, packaging (quantity × unit cost)
//! - [`LaborLine`] - cutting, sewing, finishing operations (minutes × hourly rate)
//! - [`OverheadLine`] - factory overheads, either a flat amount or a
//!   percentage of the material + labor base
//!
//! Lines store only what the user typed. Material and labor totals are
//! derived through [`crate::calculations::line`] every time they are asked
//! for; overhead lines have no total of their own at all.
//!
//! ## Editing
//!
//! Front ends edit one field at a time with a [`LineField`] and a
//! [`FieldValue`]. Numbers pass through
//! [`sanitize_amount`](crate::calculations::line::sanitize_amount) on the way
//! in, so a half-typed negative or `NaN` is stored as zero.
//!
//! ```rust
//! use cost_core::currency::Currency;
//! use cost_core::lines::{EditableLine, FieldValue, LineField, MaterialLine};
//!
//! let mut line = MaterialLine::new(Currency::Usd);
//! line.apply(LineField::Quantity, FieldValue::Number(10.0)).unwrap();
//! line.apply(LineField::UnitCost, FieldValue::Number(5.0)).unwrap();
//! assert_eq!(line.total(), 50.0);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::line::{labor_total, material_total, sanitize_amount};
use crate::currency::Currency;
use crate::errors::{CostError, CostResult};

/// Default unit label for a new material line
pub const DEFAULT_MATERIAL_UNIT: &str = "pieces";

/// Which collection of the breakdown a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    Material,
    Labor,
    Overhead,
}

impl LineKind {
    /// Lowercase name used in CLI arguments and logs
    pub fn name(&self) -> &'static str {
        match self {
            LineKind::Material => "material",
            LineKind::Labor => "labor",
            LineKind::Overhead => "overhead",
        }
    }
}

impl FromStr for LineKind {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "material" | "materials" => Ok(LineKind::Material),
            "labor" | "labour" => Ok(LineKind::Labor),
            "overhead" | "overheads" => Ok(LineKind::Overhead),
            _ => Err(CostError::invalid_input(
                "kind",
                s,
                "Expected material, labor or overhead",
            )),
        }
    }
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How an overhead line's amount is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverheadKind {
    /// `amount` is added as is
    #[default]
    Fixed,
    /// `amount` is a percentage of the material + labor base cost
    Percentage,
}

impl FromStr for OverheadKind {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(OverheadKind::Fixed),
            "percentage" | "percent" | "%" => Ok(OverheadKind::Percentage),
            _ => Err(CostError::invalid_input(
                "overhead_kind",
                s,
                "Expected FIXED or PERCENTAGE",
            )),
        }
    }
}

impl std::fmt::Display for OverheadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverheadKind::Fixed => f.pad("FIXED"),
            OverheadKind::Percentage => f.pad("PERCENTAGE"),
        }
    }
}

/// Material consumed per garment (fabric, trims, packaging).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub id: Uuid,

    /// Material name (e.g., "Cotton twill 240gsm")
    pub name: String,

    /// Supplier, if known
    pub supplier: Option<String>,

    /// Quantity consumed, in `unit`
    pub quantity: f64,

    /// Unit label (e.g., "meters", "pieces")
    pub unit: String,

    /// Cost of one `unit`
    pub unit_cost: f64,

    pub currency: Currency,
}

impl MaterialLine {
    /// A blank material line: quantity and cost zero, unit "pieces".
    pub fn new(currency: Currency) -> Self {
        MaterialLine {
            id: Uuid::new_v4(),
            name: String::new(),
            supplier: None,
            quantity: 0.0,
            unit: DEFAULT_MATERIAL_UNIT.to_string(),
            unit_cost: 0.0,
            currency,
        }
    }

    /// quantity × unit cost
    pub fn total(&self) -> f64 {
        material_total(self.quantity, self.unit_cost)
    }
}

/// One labor operation (cutting, stitching, pressing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborLine {
    pub id: Uuid,

    /// Operation label (e.g., "Side seam overlock")
    pub operation: String,

    /// Standard minutes for the operation
    pub time_minutes: f64,

    /// Labor rate per hour
    pub rate_per_hour: f64,

    pub currency: Currency,
}

impl LaborLine {
    /// A blank labor line: zero minutes at a zero rate.
    pub fn new(currency: Currency) -> Self {
        LaborLine {
            id: Uuid::new_v4(),
            operation: String::new(),
            time_minutes: 0.0,
            rate_per_hour: 0.0,
            currency,
        }
    }

    /// (minutes / 60) × hourly rate
    pub fn total(&self) -> f64 {
        labor_total(self.time_minutes, self.rate_per_hour)
    }
}

/// Factory overhead (rent, utilities, admin). Its contribution depends on
/// the other lines, so it is only evaluated by the aggregate calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadLine {
    pub id: Uuid,

    /// Overhead category (e.g., "Utilities")
    pub category: String,

    /// Flat amount, or percentage points when `kind` is `Percentage`
    pub amount: f64,

    pub currency: Currency,

    pub kind: OverheadKind,
}

impl OverheadLine {
    /// A blank fixed overhead of zero.
    pub fn new(currency: Currency) -> Self {
        OverheadLine {
            id: Uuid::new_v4(),
            category: String::new(),
            amount: 0.0,
            currency,
            kind: OverheadKind::Fixed,
        }
    }
}

/// A single editable field of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineField {
    Name,
    Supplier,
    Quantity,
    Unit,
    UnitCost,
    Operation,
    TimeMinutes,
    RatePerHour,
    Category,
    Amount,
    OverheadKind,
    Currency,
}

impl LineField {
    /// Field name as it appears in sheet records
    pub fn name(&self) -> &'static str {
        match self {
            LineField::Name => "name",
            LineField::Supplier => "supplier",
            LineField::Quantity => "quantity",
            LineField::Unit => "unit",
            LineField::UnitCost => "unitCost",
            LineField::Operation => "operation",
            LineField::TimeMinutes => "timeMinutes",
            LineField::RatePerHour => "ratePerHour",
            LineField::Category => "category",
            LineField::Amount => "amount",
            LineField::OverheadKind => "type",
            LineField::Currency => "currency",
        }
    }

    /// Whether this field holds a number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LineField::Quantity
                | LineField::UnitCost
                | LineField::TimeMinutes
                | LineField::RatePerHour
                | LineField::Amount
        )
    }

    /// Turn raw text from a form or command line into a value for this field.
    ///
    /// Numeric fields never fail: text that does not parse becomes zero, the
    /// same as any other invalid number. Currency and overhead kind must name
    /// a known variant. An empty supplier clears it.
    pub fn parse_value(&self, raw: &str) -> CostResult<FieldValue> {
        if self.is_numeric() {
            let number = raw.trim().parse::<f64>().unwrap_or(0.0);
            return Ok(FieldValue::Number(sanitize_amount(number)));
        }
        match self {
            LineField::Currency => Ok(FieldValue::Currency(raw.parse()?)),
            LineField::OverheadKind => Ok(FieldValue::OverheadKind(raw.parse()?)),
            LineField::Supplier if raw.trim().is_empty() => Ok(FieldValue::Clear),
            _ => Ok(FieldValue::Text(raw.to_string())),
        }
    }
}

impl FromStr for LineField {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let field = match key.as_str() {
            "name" => LineField::Name,
            "supplier" => LineField::Supplier,
            "quantity" | "qty" => LineField::Quantity,
            "unit" => LineField::Unit,
            "unitcost" | "cost" => LineField::UnitCost,
            "operation" => LineField::Operation,
            "timeminutes" | "minutes" | "time" => LineField::TimeMinutes,
            "rateperhour" | "rate" => LineField::RatePerHour,
            "category" => LineField::Category,
            "amount" => LineField::Amount,
            "type" | "kind" | "overheadkind" => LineField::OverheadKind,
            "currency" => LineField::Currency,
            _ => return Err(CostError::invalid_input("field", s, "Unknown line field")),
        };
        Ok(field)
    }
}

impl std::fmt::Display for LineField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// New value for a [`LineField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Currency(Currency),
    OverheadKind(OverheadKind),
    /// Clears an optional field (supplier)
    Clear,
}

impl FieldValue {
    fn describe(&self) -> String {
        match self {
            FieldValue::Text(t) => t.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Currency(c) => c.to_string(),
            FieldValue::OverheadKind(k) => k.to_string(),
            FieldValue::Clear => "<clear>".to_string(),
        }
    }
}

fn mismatch(kind: LineKind, field: LineField, value: &FieldValue) -> CostError {
    CostError::invalid_input(
        field.name(),
        value.describe(),
        format!("Field does not accept this value on a {} line", kind),
    )
}

/// Single-field editing shared by all line kinds.
pub trait EditableLine {
    /// Which breakdown collection this line lives in
    const KIND: LineKind;

    /// Line identity
    fn id(&self) -> Uuid;

    /// Replace one field. Errors if the field does not exist on this kind of
    /// line or the value has the wrong shape; the line is unchanged then.
    fn apply(&mut self, field: LineField, value: FieldValue) -> CostResult<()>;
}

impl EditableLine for MaterialLine {
    const KIND: LineKind = LineKind::Material;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, field: LineField, value: FieldValue) -> CostResult<()> {
        match (field, value) {
            (LineField::Name, FieldValue::Text(t)) => self.name = t,
            (LineField::Supplier, FieldValue::Text(t)) => self.supplier = Some(t),
            (LineField::Supplier, FieldValue::Clear) => self.supplier = None,
            (LineField::Quantity, FieldValue::Number(n)) => self.quantity = sanitize_amount(n),
            (LineField::Unit, FieldValue::Text(t)) => self.unit = t,
            (LineField::UnitCost, FieldValue::Number(n)) => self.unit_cost = sanitize_amount(n),
            (LineField::Currency, FieldValue::Currency(c)) => self.currency = c,
            (field, value) => return Err(mismatch(Self::KIND, field, &value)),
        }
        Ok(())
    }
}

impl EditableLine for LaborLine {
    const KIND: LineKind = LineKind::Labor;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, field: LineField, value: FieldValue) -> CostResult<()> {
        match (field, value) {
            (LineField::Operation, FieldValue::Text(t)) => self.operation = t,
            (LineField::TimeMinutes, FieldValue::Number(n)) => self.time_minutes = sanitize_amount(n),
            (LineField::RatePerHour, FieldValue::Number(n)) => {
                self.rate_per_hour = sanitize_amount(n)
            }
            (LineField::Currency, FieldValue::Currency(c)) => self.currency = c,
            (field, value) => return Err(mismatch(Self::KIND, field, &value)),
        }
        Ok(())
    }
}

impl EditableLine for OverheadLine {
    const KIND: LineKind = LineKind::Overhead;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, field: LineField, value: FieldValue) -> CostResult<()> {
        match (field, value) {
            (LineField::Category, FieldValue::Text(t)) => self.category = t,
            (LineField::Amount, FieldValue::Number(n)) => self.amount = sanitize_amount(n),
            (LineField::OverheadKind, FieldValue::OverheadKind(k)) => self.kind = k,
            (LineField::Currency, FieldValue::Currency(c)) => self.currency = c,
            (field, value) => return Err(mismatch(Self::KIND, field, &value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_defaults() {
        let line = MaterialLine::new(Currency::Inr);
        assert_eq!(line.unit, "pieces");
        assert_eq!(line.quantity, 0.0);
        assert_eq!(line.unit_cost, 0.0);
        assert_eq!(line.currency, Currency::Inr);
        assert!(line.supplier.is_none());
        assert_eq!(line.total(), 0.0);
    }

    #[test]
    fn test_overhead_defaults_to_fixed() {
        let line = OverheadLine::new(Currency::Usd);
        assert_eq!(line.kind, OverheadKind::Fixed);
        assert_eq!(line.amount, 0.0);
    }

    #[test]
    fn test_labor_total_follows_edits() {
        let mut line = LaborLine::new(Currency::Usd);
        line.apply(LineField::TimeMinutes, FieldValue::Number(120.0)).unwrap();
        line.apply(LineField::RatePerHour, FieldValue::Number(20.0)).unwrap();
        assert_eq!(line.total(), 40.0);

        line.apply(LineField::TimeMinutes, FieldValue::Number(30.0)).unwrap();
        assert_eq!(line.total(), 10.0);
    }

    #[test]
    fn test_negative_number_is_stored_as_zero() {
        let mut line = MaterialLine::new(Currency::Usd);
        line.apply(LineField::Quantity, FieldValue::Number(-3.0)).unwrap();
        assert_eq!(line.quantity, 0.0);

        line.apply(LineField::UnitCost, FieldValue::Number(f64::NAN)).unwrap();
        assert_eq!(line.unit_cost, 0.0);
    }

    #[test]
    fn test_field_from_wrong_kind_is_rejected() {
        let mut line = OverheadLine::new(Currency::Usd);
        let before = line.clone();
        let err = line
            .apply(LineField::Quantity, FieldValue::Number(1.0))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(line, before);
    }

    #[test]
    fn test_wrong_value_shape_is_rejected() {
        let mut line = MaterialLine::new(Currency::Usd);
        assert!(line
            .apply(LineField::Quantity, FieldValue::Text("ten".into()))
            .is_err());
        assert_eq!(line.quantity, 0.0);
    }

    #[test]
    fn test_supplier_can_be_cleared() {
        let mut line = MaterialLine::new(Currency::Usd);
        line.apply(LineField::Supplier, FieldValue::Text("Arvind Mills".into()))
            .unwrap();
        assert_eq!(line.supplier.as_deref(), Some("Arvind Mills"));
        line.apply(LineField::Supplier, FieldValue::Clear).unwrap();
        assert!(line.supplier.is_none());
    }

    #[test]
    fn test_parse_value_coerces_bad_numbers() {
        assert_eq!(
            LineField::Quantity.parse_value("abc").unwrap(),
            FieldValue::Number(0.0)
        );
        assert_eq!(
            LineField::Amount.parse_value("-4").unwrap(),
            FieldValue::Number(0.0)
        );
        assert_eq!(
            LineField::UnitCost.parse_value(" 2.5 ").unwrap(),
            FieldValue::Number(2.5)
        );
        assert_eq!(
            LineField::OverheadKind.parse_value("percentage").unwrap(),
            FieldValue::OverheadKind(OverheadKind::Percentage)
        );
        assert!(LineField::Currency.parse_value("XYZ").is_err());
    }

    #[test]
    fn test_field_names_parse() {
        assert_eq!("unit_cost".parse::<LineField>().unwrap(), LineField::UnitCost);
        assert_eq!("ratePerHour".parse::<LineField>().unwrap(), LineField::RatePerHour);
        assert_eq!("time-minutes".parse::<LineField>().unwrap(), LineField::TimeMinutes);
        assert!("colour".parse::<LineField>().is_err());
    }

    #[test]
    fn test_overhead_kind_serialization() {
        let json = serde_json::to_string(&OverheadKind::Percentage).unwrap();
        assert_eq!(json, "\"PERCENTAGE\"");
    }
}
