//! # Cost Breakdown
//!
//! The in-memory line store of one costing sheet: three ordered collections
//! (materials, labor, overheads) and the add / update / remove operations a
//! sheet editor performs on them.
//!
//! Order is display order only; no total depends on it.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::breakdown::CostBreakdown;
//! use cost_core::currency::Currency;
//! use cost_core::lines::{FieldValue, LineField, LineKind};
//!
//! let mut breakdown = CostBreakdown::new();
//! let id = breakdown
//!     .add_line(LineKind::Material, Currency::Usd, &[(LineField::Quantity, FieldValue::Number(2.0))])
//!     .unwrap();
//!
//! breakdown
//!     .update_line(LineKind::Material, id, LineField::UnitCost, FieldValue::Number(3.5))
//!     .unwrap();
//! assert_eq!(breakdown.materials[0].total(), 7.0);
//!
//! assert!(breakdown.remove_line(LineKind::Material, id));
//! assert!(breakdown.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Currency;
use crate::errors::CostResult;
use crate::lines::{
    EditableLine, FieldValue, LaborLine, LineField, LineKind, MaterialLine, OverheadLine,
};

/// Ordered line items of one costing sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub materials: Vec<MaterialLine>,
    pub labor: Vec<LaborLine>,
    pub overheads: Vec<OverheadLine>,
}

impl CostBreakdown {
    /// An empty breakdown.
    pub fn new() -> Self {
        CostBreakdown::default()
    }

    /// True when there are no lines of any kind
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.labor.is_empty() && self.overheads.is_empty()
    }

    /// Total number of lines across all three collections
    pub fn line_count(&self) -> usize {
        self.materials.len() + self.labor.len() + self.overheads.len()
    }

    /// Number of lines of one kind
    pub fn count(&self, kind: LineKind) -> usize {
        match kind {
            LineKind::Material => self.materials.len(),
            LineKind::Labor => self.labor.len(),
            LineKind::Overhead => self.overheads.len(),
        }
    }

    /// Whether a line with this id exists in the given collection
    pub fn contains(&self, kind: LineKind, id: Uuid) -> bool {
        match kind {
            LineKind::Material => self.materials.iter().any(|l| l.id == id),
            LineKind::Labor => self.labor.iter().any(|l| l.id == id),
            LineKind::Overhead => self.overheads.iter().any(|l| l.id == id),
        }
    }

    /// Append a new line of `kind` and return its id.
    ///
    /// The line starts from the kind's defaults in `currency`, then `fields`
    /// are applied in order. If any field is rejected nothing is appended.
    pub fn add_line(
        &mut self,
        kind: LineKind,
        currency: Currency,
        fields: &[(LineField, FieldValue)],
    ) -> CostResult<Uuid> {
        let id = match kind {
            LineKind::Material => {
                let line = build(MaterialLine::new(currency), fields)?;
                let id = line.id;
                self.materials.push(line);
                id
            }
            LineKind::Labor => {
                let line = build(LaborLine::new(currency), fields)?;
                let id = line.id;
                self.labor.push(line);
                id
            }
            LineKind::Overhead => {
                let line = build(OverheadLine::new(currency), fields)?;
                let id = line.id;
                self.overheads.push(line);
                id
            }
        };
        debug_assert_eq!(self.ids(kind).filter(|other| *other == id).count(), 1);
        Ok(id)
    }

    /// Replace one field on one line.
    ///
    /// Returns `Ok(false)` if no line has this id (nothing changes), and an
    /// error if the field/value does not fit the line kind.
    pub fn update_line(
        &mut self,
        kind: LineKind,
        id: Uuid,
        field: LineField,
        value: FieldValue,
    ) -> CostResult<bool> {
        match kind {
            LineKind::Material => update_in(&mut self.materials, id, field, value),
            LineKind::Labor => update_in(&mut self.labor, id, field, value),
            LineKind::Overhead => update_in(&mut self.overheads, id, field, value),
        }
    }

    /// Remove a line by id. Returns whether anything was removed; removing an
    /// unknown id is a no-op.
    pub fn remove_line(&mut self, kind: LineKind, id: Uuid) -> bool {
        match kind {
            LineKind::Material => remove_from(&mut self.materials, id),
            LineKind::Labor => remove_from(&mut self.labor, id),
            LineKind::Overhead => remove_from(&mut self.overheads, id),
        }
    }

    /// Deep copy with every line given a fresh id.
    pub fn with_fresh_ids(&self) -> Self {
        let mut copy = self.clone();
        copy.materials.iter_mut().for_each(|l| l.id = Uuid::new_v4());
        copy.labor.iter_mut().for_each(|l| l.id = Uuid::new_v4());
        copy.overheads.iter_mut().for_each(|l| l.id = Uuid::new_v4());
        copy
    }

    /// Lines whose currency differs from `currency`, in breakdown order.
    pub fn lines_not_in(&self, currency: Currency) -> Vec<(LineKind, Uuid)> {
        let materials = self
            .materials
            .iter()
            .filter(|l| l.currency != currency)
            .map(|l| (LineKind::Material, l.id));
        let labor = self
            .labor
            .iter()
            .filter(|l| l.currency != currency)
            .map(|l| (LineKind::Labor, l.id));
        let overheads = self
            .overheads
            .iter()
            .filter(|l| l.currency != currency)
            .map(|l| (LineKind::Overhead, l.id));
        materials.chain(labor).chain(overheads).collect()
    }

    fn ids(&self, kind: LineKind) -> Box<dyn Iterator<Item = Uuid> + '_> {
        match kind {
            LineKind::Material => Box::new(self.materials.iter().map(|l| l.id)),
            LineKind::Labor => Box::new(self.labor.iter().map(|l| l.id)),
            LineKind::Overhead => Box::new(self.overheads.iter().map(|l| l.id)),
        }
    }
}

fn build<L: EditableLine>(mut line: L, fields: &[(LineField, FieldValue)]) -> CostResult<L> {
    for (field, value) in fields {
        line.apply(*field, value.clone())?;
    }
    Ok(line)
}

fn update_in<L: EditableLine>(
    lines: &mut [L],
    id: Uuid,
    field: LineField,
    value: FieldValue,
) -> CostResult<bool> {
    match lines.iter_mut().find(|l| l.id() == id) {
        Some(line) => {
            line.apply(field, value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn remove_from<L: EditableLine>(lines: &mut Vec<L>, id: Uuid) -> bool {
    let before = lines.len();
    lines.retain(|l| l.id() != id);
    lines.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::OverheadKind;

    #[test]
    fn test_add_line_uses_defaults_and_currency() {
        let mut breakdown = CostBreakdown::new();
        breakdown.add_line(LineKind::Material, Currency::Eur, &[]).unwrap();
        breakdown.add_line(LineKind::Labor, Currency::Eur, &[]).unwrap();
        breakdown.add_line(LineKind::Overhead, Currency::Eur, &[]).unwrap();

        assert_eq!(breakdown.materials[0].unit, "pieces");
        assert_eq!(breakdown.materials[0].currency, Currency::Eur);
        assert_eq!(breakdown.labor[0].rate_per_hour, 0.0);
        assert_eq!(breakdown.overheads[0].kind, OverheadKind::Fixed);
        assert_eq!(breakdown.line_count(), 3);
    }

    #[test]
    fn test_add_line_with_initial_fields() {
        let mut breakdown = CostBreakdown::new();
        breakdown
            .add_line(
                LineKind::Labor,
                Currency::Usd,
                &[
                    (LineField::Operation, FieldValue::Text("Hemming".into())),
                    (LineField::TimeMinutes, FieldValue::Number(6.0)),
                    (LineField::RatePerHour, FieldValue::Number(10.0)),
                ],
            )
            .unwrap();
        assert_eq!(breakdown.labor[0].operation, "Hemming");
        assert_eq!(breakdown.labor[0].total(), 1.0);
    }

    #[test]
    fn test_rejected_initial_field_adds_nothing() {
        let mut breakdown = CostBreakdown::new();
        let result = breakdown.add_line(
            LineKind::Overhead,
            Currency::Usd,
            &[(LineField::Quantity, FieldValue::Number(3.0))],
        );
        assert!(result.is_err());
        assert!(breakdown.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut breakdown = CostBreakdown::new();
        let ids: Vec<Uuid> = (0..50)
            .map(|_| breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap())
            .collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut breakdown = CostBreakdown::new();
        breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();
        let before = breakdown.clone();

        let updated = breakdown
            .update_line(LineKind::Material, Uuid::new_v4(), LineField::Quantity, FieldValue::Number(9.0))
            .unwrap();
        assert!(!updated);
        assert_eq!(breakdown, before);
    }

    #[test]
    fn test_update_looks_only_in_given_kind() {
        let mut breakdown = CostBreakdown::new();
        let id = breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();
        let updated = breakdown
            .update_line(LineKind::Labor, id, LineField::TimeMinutes, FieldValue::Number(9.0))
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut breakdown = CostBreakdown::new();
        let keep = breakdown.add_line(LineKind::Overhead, Currency::Usd, &[]).unwrap();
        let drop = breakdown.add_line(LineKind::Overhead, Currency::Usd, &[]).unwrap();

        assert!(breakdown.remove_line(LineKind::Overhead, drop));
        assert!(!breakdown.remove_line(LineKind::Overhead, drop));
        assert_eq!(breakdown.overheads.len(), 1);
        assert_eq!(breakdown.overheads[0].id, keep);
    }

    #[test]
    fn test_removal_keeps_display_order() {
        let mut breakdown = CostBreakdown::new();
        let a = breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();
        let b = breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();
        let c = breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();

        breakdown.remove_line(LineKind::Material, b);
        let order: Vec<Uuid> = breakdown.materials.iter().map(|l| l.id).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn test_with_fresh_ids() {
        let mut breakdown = CostBreakdown::new();
        let id = breakdown
            .add_line(LineKind::Material, Currency::Usd, &[(LineField::Quantity, FieldValue::Number(4.0))])
            .unwrap();
        let copy = breakdown.with_fresh_ids();
        assert_ne!(copy.materials[0].id, id);
        assert_eq!(copy.materials[0].quantity, 4.0);
    }

    #[test]
    fn test_lines_not_in_currency() {
        let mut breakdown = CostBreakdown::new();
        breakdown.add_line(LineKind::Material, Currency::Usd, &[]).unwrap();
        let eur = breakdown.add_line(LineKind::Labor, Currency::Eur, &[]).unwrap();
        assert_eq!(breakdown.lines_not_in(Currency::Usd), vec![(LineKind::Labor, eur)]);
    }
}
