//! Subcommand implementations.
//!
//! Each editing command opens the sheet in an [`EditSession`], applies one
//! change, saves, and prints the refreshed figures.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cost_core::{
    pdf, CostError, CostingSheet, DirectoryGateway, EditSession, FieldValue, LineField, LineKind,
    PersistenceGateway, SheetRecord, TaxConfiguration,
};
use serde_json::json;
use uuid::Uuid;

use crate::config::{Command, CliConfig};

pub fn run(config: &CliConfig, command: Command) -> Result<()> {
    let mut store = DirectoryGateway::open(&config.sheets_dir, config.user.as_str())
        .with_context(|| format!("Failed to open sheet directory {}", config.sheets_dir.display()))?;

    match command {
        Command::New { name, currency, margin } => {
            let sheet = match name {
                Some(name) => CostingSheet::new(name),
                None => CostingSheet::untitled(),
            };
            let mut session = EditSession::new(sheet);
            if let Some(currency) = currency {
                session.set_currency(currency);
            }
            if let Some(margin) = margin {
                session.set_profit_margin(margin);
            }
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::List => list(&store, config.json),
        Command::Show { sheet } => {
            let id = resolve_sheet(&store, &sheet)?;
            let session = EditSession::open(&store, id)?;
            if let Some(holder) = store.lock_holder(id) {
                eprintln!(
                    "Being saved by {} on {} since {}",
                    holder.user_id,
                    holder.machine,
                    holder.locked_at.format("%Y-%m-%d %H:%M")
                );
            }
            print_sheet(session.sheet(), config.json)
        }
        Command::Check { sheet } => {
            let id = resolve_sheet(&store, &sheet)?;
            let session = EditSession::open(&store, id)?;
            check(session.sheet(), config.json)
        }
        Command::Add { sheet, kind, set } => {
            let mut session = open(&store, &sheet)?;
            let fields = set
                .iter()
                .map(|(field, raw)| Ok((*field, field.parse_value(raw)?)))
                .collect::<Result<Vec<(LineField, FieldValue)>, CostError>>()?;
            let line_id = session.add_line(kind, &fields)?;
            session.save(&mut store)?;
            if !config.json {
                println!("Added {} line {}", kind, line_id);
            }
            print_sheet(session.sheet(), config.json)
        }
        Command::Update { sheet, kind, line, field, value } => {
            let mut session = open(&store, &sheet)?;
            let value = field.parse_value(&value)?;
            let updated = match resolve_line(session.sheet(), kind, &line) {
                Some(line_id) => session.update_line(kind, line_id, field, value)?,
                None => false,
            };
            if !updated {
                eprintln!("No {} line matches '{}'; nothing changed", kind, line);
                return Ok(());
            }
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::Remove { sheet, kind, line } => {
            let mut session = open(&store, &sheet)?;
            let removed = match resolve_line(session.sheet(), kind, &line) {
                Some(line_id) => session.remove_line(kind, line_id),
                None => false,
            };
            if !removed {
                eprintln!("No {} line matches '{}'; nothing changed", kind, line);
                return Ok(());
            }
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::Tax { sheet, vat, customs, other } => {
            let mut session = open(&store, &sheet)?;
            let current = session.sheet().tax;
            session.set_tax(TaxConfiguration::new(
                vat.unwrap_or(current.vat_rate),
                customs.unwrap_or(current.customs_duty),
                other.unwrap_or(current.other_taxes),
            ));
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::Margin { sheet, percent } => {
            let mut session = open(&store, &sheet)?;
            session.set_profit_margin(percent);
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::Currency { sheet, currency } => {
            let mut session = open(&store, &sheet)?;
            session.set_currency(currency);
            session.save(&mut store)?;
            let mixed = session.sheet().mixed_currency_lines();
            if !mixed.is_empty() {
                tracing::warn!(
                    lines = mixed.len(),
                    "Existing lines keep their currency; amounts are summed without conversion"
                );
            }
            print_sheet(session.sheet(), config.json)
        }
        Command::Rename { sheet, name } => {
            let mut session = open(&store, &sheet)?;
            session.rename(name);
            session.save(&mut store)?;
            print_sheet(session.sheet(), config.json)
        }
        Command::Clone { sheet } => {
            let source = open(&store, &sheet)?;
            let mut copy = EditSession::new(source.sheet().clone_as_new());
            copy.save(&mut store)?;
            print_sheet(copy.sheet(), config.json)
        }
        Command::Delete { sheet } => {
            let id = resolve_sheet(&store, &sheet)?;
            store.delete(id)?;
            if config.json {
                println!("{}", json!({ "deleted": id }));
            } else {
                println!("Deleted sheet {}", id);
            }
            Ok(())
        }
        Command::Report { sheet, output, prepared_by } => {
            let session = open(&store, &sheet)?;
            let sheet = session.sheet();
            let prepared_by = prepared_by.unwrap_or_else(|| config.user.clone());
            let bytes = pdf::render_sheet_pdf(sheet, &prepared_by)?;
            let output = output.unwrap_or_else(|| default_report_path(&sheet.name));
            std::fs::write(&output, bytes)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            println!("Wrote {}", output.display());
            Ok(())
        }
    }
}

fn open(store: &DirectoryGateway, key: &str) -> Result<EditSession> {
    let id = resolve_sheet(store, key)?;
    Ok(EditSession::open(store, id)?)
}

/// Find a sheet by full id, exact name (case-insensitive) or unique id prefix.
fn resolve_sheet(store: &DirectoryGateway, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }

    let listings = store.list()?;
    let by_name: Vec<Uuid> = listings
        .iter()
        .filter(|l| l.name.eq_ignore_ascii_case(key.trim()))
        .map(|l| l.id)
        .collect();
    match by_name.as_slice() {
        [id] => return Ok(*id),
        [] => {}
        _ => bail!("Several sheets are named '{}'; use the id instead", key),
    }

    let by_prefix: Vec<Uuid> = listings
        .iter()
        .filter(|l| !key.is_empty() && l.id.to_string().starts_with(key))
        .map(|l| l.id)
        .collect();
    match by_prefix.as_slice() {
        [id] => Ok(*id),
        [] => Err(CostError::sheet_not_found(key).into()),
        _ => bail!("Id prefix '{}' matches several sheets", key),
    }
}

/// Find a line of `kind` by full id or unique id prefix.
fn resolve_line(sheet: &CostingSheet, kind: LineKind, key: &str) -> Option<Uuid> {
    let ids: Vec<Uuid> = match kind {
        LineKind::Material => sheet.breakdown.materials.iter().map(|l| l.id).collect(),
        LineKind::Labor => sheet.breakdown.labor.iter().map(|l| l.id).collect(),
        LineKind::Overhead => sheet.breakdown.overheads.iter().map(|l| l.id).collect(),
    };
    if let Ok(id) = Uuid::parse_str(key) {
        return Some(id);
    }
    let mut matches = ids.into_iter().filter(|id| !key.is_empty() && id.to_string().starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Some(id),
        _ => None,
    }
}

fn default_report_path(name: &str) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');
    let stem = if stem.is_empty() { "costing-sheet" } else { stem };
    PathBuf::from(format!("{}.pdf", stem))
}

fn list(store: &DirectoryGateway, as_json: bool) -> Result<()> {
    let listings = store.list()?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }
    if listings.is_empty() {
        println!("No sheets in {}", store.dir().display());
        return Ok(());
    }
    println!("{:<36}  {:<30}  {:>14}  Updated", "Id", "Name", "Selling price");
    for listing in listings {
        println!(
            "{:<36}  {:<30}  {:>14}  {}",
            listing.id,
            listing.name,
            listing.currency.format_amount(listing.selling_price),
            listing.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

fn check(sheet: &CostingSheet, as_json: bool) -> Result<()> {
    let issues = sheet.validate();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(());
    }
    if issues.is_empty() {
        println!("'{}': all inputs valid", sheet.name);
    }
    for issue in issues {
        println!("{} = {}: {}", issue.field, issue.value, issue.reason);
    }
    Ok(())
}

fn print_sheet(sheet: &CostingSheet, as_json: bool) -> Result<()> {
    let summary = sheet.summary();
    if as_json {
        let output = json!({
            "sheet": SheetRecord::from(sheet),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let money = |amount: f64| sheet.currency.format_amount(amount);

    println!("═══════════════════════════════════════");
    println!("  {} ({})", sheet.name, sheet.currency);
    println!("  id: {}", sheet.id);
    println!("═══════════════════════════════════════");

    println!();
    println!("Materials:");
    for line in &sheet.breakdown.materials {
        println!(
            "  {}  {:<24} {:>8.2} {:<8} x {:>10} = {:>10}",
            short_id(line.id),
            line.name,
            line.quantity,
            line.unit,
            line.currency.format_amount(line.unit_cost),
            line.currency.format_amount(line.total()),
        );
    }
    println!("Labor:");
    for line in &sheet.breakdown.labor {
        println!(
            "  {}  {:<24} {:>8.1} min @ {:>10}/h = {:>10}",
            short_id(line.id),
            line.operation,
            line.time_minutes,
            line.currency.format_amount(line.rate_per_hour),
            line.currency.format_amount(line.total()),
        );
    }
    println!("Overheads:");
    for line in &sheet.breakdown.overheads {
        println!(
            "  {}  {:<24} {:>10} {:>10.2}",
            short_id(line.id),
            line.category,
            line.kind,
            line.amount,
        );
    }

    println!();
    println!("  Material cost:  {:>12}", money(summary.total_material_cost));
    println!("  Labor cost:     {:>12}", money(summary.total_labor_cost));
    println!("  Overhead cost:  {:>12}", money(summary.total_overhead_cost));
    println!("  Subtotal:       {:>12}", money(summary.subtotal));
    println!(
        "  Tax ({:.2}%):    {:>12}",
        sheet.tax.combined_rate(),
        money(summary.total_tax)
    );
    println!("  Cost of goods:  {:>12}", money(summary.total_cost));
    println!(
        "  Margin ({:.2}%): {:>12}",
        sheet.profit_margin,
        money(summary.profit_amount)
    );
    println!("───────────────────────────────────────");
    println!("  SELLING PRICE:  {:>12}", money(summary.selling_price));
    Ok(())
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cost_core::Currency;

    #[test]
    fn test_default_report_path() {
        assert_eq!(default_report_path("Denim Jacket FW26"), PathBuf::from("denim-jacket-fw26.pdf"));
        assert_eq!(default_report_path("***"), PathBuf::from("costing-sheet.pdf"));
    }

    #[test]
    fn test_resolve_line_by_prefix() {
        let mut sheet = CostingSheet::new("Tee");
        let id = sheet.add_line(LineKind::Labor, &[]).unwrap();
        let prefix = &id.to_string()[..8];

        assert_eq!(resolve_line(&sheet, LineKind::Labor, prefix), Some(id));
        assert_eq!(resolve_line(&sheet, LineKind::Material, prefix), None);
        assert_eq!(resolve_line(&sheet, LineKind::Labor, ""), None);
    }

    #[test]
    fn test_resolve_sheet_by_name_and_prefix() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = DirectoryGateway::open(dir.path(), "tester").unwrap();
        let mut sheet = CostingSheet::new("Rain Jacket");
        sheet.set_currency(Currency::Gbp);
        store.save(&SheetRecord::from(&sheet)).unwrap();

        assert_eq!(resolve_sheet(&store, "rain jacket").unwrap(), sheet.id);
        assert_eq!(resolve_sheet(&store, &sheet.id.to_string()[..6]).unwrap(), sheet.id);
        assert!(resolve_sheet(&store, "parka").is_err());
    }
}
