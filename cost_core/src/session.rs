//! # Edit Session
//!
//! Tracks one sheet while a user edits it:
//!
//! ```text
//!   new ──► Unsaved ──save──► Saved ──edit──► Dirty ──save──► Saved
//!              ▲  │                             │
//!              └──┘ edit                 discard └──► Saved (last saved copy)
//! ```
//!
//! Edits only touch the in-memory sheet. `save` pushes a fresh
//! [`SheetRecord`] through a [`PersistenceGateway`]; if the gateway fails,
//! the sheet and state are exactly as before and the same save can be
//! retried. `&mut self` on `save` means one save per session at a time.

use uuid::Uuid;

use crate::calculations::aggregate::CostSummary;
use crate::currency::Currency;
use crate::errors::CostResult;
use crate::gateway::PersistenceGateway;
use crate::lines::{FieldValue, LineField, LineKind};
use crate::record::SheetRecord;
use crate::sheet::{CostingSheet, TaxConfiguration};

/// Where a sheet stands relative to its stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    /// Never saved
    Unsaved,
    /// Matches the stored copy
    Saved,
    /// Edited since the last save
    Dirty,
}

/// A sheet being edited, plus its save state.
#[derive(Debug, Clone)]
pub struct EditSession {
    sheet: CostingSheet,
    state: SheetState,
    last_saved: Option<SheetRecord>,
}

impl EditSession {
    /// Start editing a sheet that has not been stored yet.
    pub fn new(sheet: CostingSheet) -> Self {
        EditSession {
            sheet,
            state: SheetState::Unsaved,
            last_saved: None,
        }
    }

    /// Load a stored sheet for editing.
    pub fn open<G>(gateway: &G, id: Uuid) -> CostResult<Self>
    where
        G: PersistenceGateway + ?Sized,
    {
        let record = gateway.load(id)?;
        Ok(EditSession {
            sheet: CostingSheet::from(record.clone()),
            state: SheetState::Saved,
            last_saved: Some(record),
        })
    }

    pub fn sheet(&self) -> &CostingSheet {
        &self.sheet
    }

    pub fn state(&self) -> SheetState {
        self.state
    }

    /// True unless the sheet matches its stored copy
    pub fn has_unsaved_changes(&self) -> bool {
        self.state != SheetState::Saved
    }

    /// Derived values of the in-memory sheet; no gateway involved.
    pub fn summary(&self) -> CostSummary {
        self.sheet.summary()
    }

    fn mark_edited(&mut self) {
        if self.state == SheetState::Saved {
            self.state = SheetState::Dirty;
        }
    }

    pub fn add_line(&mut self, kind: LineKind, fields: &[(LineField, FieldValue)]) -> CostResult<Uuid> {
        let id = self.sheet.add_line(kind, fields)?;
        self.mark_edited();
        Ok(id)
    }

    /// See [`CostingSheet::update_line`]. An update to an unknown line does
    /// not make the session dirty.
    pub fn update_line(
        &mut self,
        kind: LineKind,
        id: Uuid,
        field: LineField,
        value: FieldValue,
    ) -> CostResult<bool> {
        let updated = self.sheet.update_line(kind, id, field, value)?;
        if updated {
            self.mark_edited();
        }
        Ok(updated)
    }

    pub fn remove_line(&mut self, kind: LineKind, id: Uuid) -> bool {
        let removed = self.sheet.remove_line(kind, id);
        if removed {
            self.mark_edited();
        }
        removed
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.sheet.set_currency(currency);
        self.mark_edited();
    }

    pub fn set_profit_margin(&mut self, percent: f64) {
        self.sheet.set_profit_margin(percent);
        self.mark_edited();
    }

    pub fn set_tax(&mut self, tax: TaxConfiguration) {
        self.sheet.set_tax(tax);
        self.mark_edited();
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.sheet.rename(name);
        self.mark_edited();
    }

    /// Commit the in-memory sheet through `gateway`.
    ///
    /// On error nothing here changes: the state stays `Unsaved`/`Dirty`.
    pub fn save<G>(&mut self, gateway: &mut G) -> CostResult<()>
    where
        G: PersistenceGateway + ?Sized,
    {
        let record = SheetRecord::from(&self.sheet);
        if let Err(e) = gateway.save(&record) {
            tracing::warn!(sheet_id = %self.sheet.id, error = %e, code = e.error_code(), "Save failed; keeping local edits");
            return Err(e);
        }
        self.state = SheetState::Saved;
        self.last_saved = Some(record);
        Ok(())
    }

    /// Throw away edits and go back to the last saved copy.
    ///
    /// Returns `false` (and keeps the edits) if the sheet was never saved.
    pub fn discard(&mut self) -> bool {
        match &self.last_saved {
            Some(record) => {
                self.sheet = CostingSheet::from(record.clone());
                self.state = SheetState::Saved;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CostError;
    use crate::gateway::{MemoryGateway, SheetListing};

    /// Gateway whose writes always fail, like a store that is offline.
    struct OfflineGateway;

    impl PersistenceGateway for OfflineGateway {
        fn load(&self, id: Uuid) -> CostResult<SheetRecord> {
            Err(CostError::sheet_not_found(id))
        }

        fn save(&mut self, record: &SheetRecord) -> CostResult<()> {
            Err(CostError::file_error("save", record.id.to_string(), "store unavailable"))
        }

        fn delete(&mut self, id: Uuid) -> CostResult<()> {
            Err(CostError::sheet_not_found(id))
        }

        fn list(&self) -> CostResult<Vec<SheetListing>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_state_machine() {
        let mut store = MemoryGateway::new();
        let mut session = EditSession::new(CostingSheet::new("Blazer"));
        assert_eq!(session.state(), SheetState::Unsaved);

        session.add_line(LineKind::Material, &[]).unwrap();
        assert_eq!(session.state(), SheetState::Unsaved);

        session.save(&mut store).unwrap();
        assert_eq!(session.state(), SheetState::Saved);
        assert!(!session.has_unsaved_changes());

        session.set_profit_margin(25.0);
        assert_eq!(session.state(), SheetState::Dirty);

        session.save(&mut store).unwrap();
        assert_eq!(session.state(), SheetState::Saved);
    }

    #[test]
    fn test_noop_update_keeps_saved_state() {
        let mut store = MemoryGateway::new();
        let mut session = EditSession::new(CostingSheet::new("Scarf"));
        session.save(&mut store).unwrap();

        let updated = session
            .update_line(LineKind::Labor, Uuid::new_v4(), LineField::TimeMinutes, FieldValue::Number(5.0))
            .unwrap();
        assert!(!updated);
        assert!(!session.remove_line(LineKind::Labor, Uuid::new_v4()));
        assert_eq!(session.state(), SheetState::Saved);
    }

    #[test]
    fn test_failed_save_leaves_sheet_untouched() {
        let mut store = MemoryGateway::new();
        let mut session = EditSession::new(CostingSheet::new("Coat"));
        session.save(&mut store).unwrap();
        session.add_line(LineKind::Overhead, &[(LineField::Amount, FieldValue::Number(8.0))]).unwrap();
        let before = session.sheet().clone();

        let mut offline = OfflineGateway;
        let err = session.save(&mut offline).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(session.state(), SheetState::Dirty);
        assert_eq!(session.sheet(), &before);

        // Retry against a working store
        session.save(&mut store).unwrap();
        assert_eq!(session.state(), SheetState::Saved);
        assert_eq!(
            CostingSheet::from(store.load(before.id).unwrap()).summary(),
            before.summary()
        );
    }

    #[test]
    fn test_discard_restores_last_save() {
        let mut store = MemoryGateway::new();
        let mut session = EditSession::new(CostingSheet::new("Dress"));
        session.set_profit_margin(10.0);
        session.save(&mut store).unwrap();

        session.set_profit_margin(90.0);
        session.add_line(LineKind::Material, &[]).unwrap();
        assert!(session.discard());
        assert_eq!(session.state(), SheetState::Saved);
        assert_eq!(session.sheet().profit_margin, 10.0);
        assert!(session.sheet().breakdown.is_empty());
    }

    #[test]
    fn test_discard_without_save_keeps_edits() {
        let mut session = EditSession::new(CostingSheet::new("Draft"));
        session.add_line(LineKind::Labor, &[]).unwrap();
        assert!(!session.discard());
        assert_eq!(session.sheet().breakdown.labor.len(), 1);
    }

    #[test]
    fn test_open_existing() {
        let mut store = MemoryGateway::new();
        let sheet = CostingSheet::new("Stored");
        store.save(&SheetRecord::from(&sheet)).unwrap();

        let session = EditSession::open(&store, sheet.id).unwrap();
        assert_eq!(session.state(), SheetState::Saved);
        assert_eq!(session.sheet().name, "Stored");

        assert!(EditSession::open(&store, Uuid::new_v4()).is_err());
    }
}
