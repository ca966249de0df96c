//! # PDF Generation Module
//!
//! Renders a costing sheet report with Typst: every line with its total,
//! the overhead breakdown, tax, cost of goods and selling price.
//!
//! ## Architecture
//!
//! - The Typst template is embedded as a string constant
//! - Data is injected via placeholder replacement before compilation
//! - Fonts come from `typst-assets`; output is raw PDF bytes (`Vec<u8>`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use cost_core::pdf::render_sheet_pdf;
//! use cost_core::sheet::CostingSheet;
//!
//! let sheet = CostingSheet::new("Denim jacket FW26");
//! let pdf_bytes = render_sheet_pdf(&sheet, "Costing team").unwrap();
//! std::fs::write("denim-jacket.pdf", pdf_bytes).unwrap();
//! ```

use chrono::Utc;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::calculations::aggregate::{overhead_contribution, BaseCost};
use crate::calculations::line::sanitize_amount;
use crate::currency::Currency;
use crate::errors::{CostError, CostResult};
use crate::lines::OverheadKind;
use crate::sheet::CostingSheet;

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A minimal Typst world for compiling documents without external files.
struct PdfWorld {
    main: Source,
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
    library: LazyHash<Library>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        let fonts = Self::load_fonts();
        let book = FontBook::from_fonts(&fonts);

        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(book),
            fonts,
            library: LazyHash::new(Library::default()),
        }
    }

    fn load_fonts() -> Vec<Font> {
        typst_assets::fonts()
            .flat_map(|font_bytes| Font::iter(Bytes::new(font_bytes.to_vec())))
            .collect()
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// PDF Template
// ============================================================================

/// Typst template for a costing sheet report
const SHEET_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (top: 2cm, bottom: 2cm, left: 2cm, right: 2cm),
  header: align(right)[
    #text(size: 9pt, fill: gray)[Stitchcost Costing Sheet]
  ],
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[{{SHEET_NAME}}]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{{DATE}}]],
    )
  ]
)

#set text(size: 10pt)

#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 18pt, weight: "bold")[Costing Sheet]
    #v(4pt)
    #text(size: 14pt)[{{SHEET_NAME}}]
  ]
]

#v(8pt)

#table(
  columns: (auto, 1fr),
  stroke: none,
  row-gutter: 4pt,
  [Prepared by:], [{{PREPARED_BY}}],
  [Currency:], [{{CURRENCY}}],
  [Last modified:], [{{MODIFIED}}],
)

== Materials

#table(
  columns: (1fr, auto, auto, auto, auto),
  inset: 6pt,
  stroke: 0.5pt,
  align: (left, left, right, right, right),
  table.header([*Material*], [*Supplier*], [*Quantity*], [*Unit Cost*], [*Total*]),
{{MATERIAL_ROWS}}
)

== Labor

#table(
  columns: (1fr, auto, auto, auto),
  inset: 6pt,
  stroke: 0.5pt,
  align: (left, right, right, right),
  table.header([*Operation*], [*Minutes*], [*Rate / h*], [*Total*]),
{{LABOR_ROWS}}
)

== Overheads

#table(
  columns: (1fr, auto, auto, auto),
  inset: 6pt,
  stroke: 0.5pt,
  align: (left, left, right, right),
  table.header([*Category*], [*Type*], [*Amount*], [*Cost*]),
{{OVERHEAD_ROWS}}
)

#v(12pt)
#line(length: 100%, stroke: 0.5pt)

== Summary

#table(
  columns: (1fr, auto),
  inset: 6pt,
  stroke: 0.5pt,
  align: (left, right),
  [Total material cost], [{{TOTAL_MATERIAL}}],
  [Total labor cost], [{{TOTAL_LABOR}}],
  [Total overhead cost], [{{TOTAL_OVERHEAD}}],
  [*Subtotal*], [*{{SUBTOTAL}}*],
  [Tax (VAT {{VAT}}% + customs {{CUSTOMS}}% + other {{OTHER}}%)], [{{TOTAL_TAX}}],
  [*Cost of goods*], [*{{TOTAL_COST}}*],
  [Profit margin {{MARGIN}}%], [{{PROFIT}}],
)

#v(12pt)

#align(center)[
  #block(width: auto, fill: rgb("#d4edda"), inset: 16pt, radius: 4pt)[
    #text(size: 16pt, weight: "bold")[Selling price: {{SELLING_PRICE}}]
  ]
]

{{CURRENCY_NOTE}}
"##;

// ============================================================================
// PDF Rendering
// ============================================================================

/// Render a costing sheet to PDF.
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - PDF file as bytes
/// * `Err(CostError::ReportFailed)` - If Typst compilation or PDF export fails
pub fn render_sheet_pdf(sheet: &CostingSheet, prepared_by: &str) -> CostResult<Vec<u8>> {
    let source = build_source(sheet, prepared_by);

    let world = PdfWorld::new(source);
    let warned = typst::compile(&world);

    let document = warned.output.map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        CostError::ReportFailed {
            reason: format!("Typst compilation failed: {}", error_msgs.join("; ")),
        }
    })?;

    let pdf_bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        CostError::ReportFailed {
            reason: format!("PDF rendering failed: {}", error_msgs.join("; ")),
        }
    })?;

    tracing::info!(sheet_id = %sheet.id, bytes = pdf_bytes.len(), "Rendered costing report");
    Ok(pdf_bytes)
}

/// Fill the template for `sheet`.
fn build_source(sheet: &CostingSheet, prepared_by: &str) -> String {
    let summary = sheet.summary();
    let money = |amount: f64| escape_typst(&sheet.currency.format_amount(amount));

    let currency_note = if sheet.mixed_currency_lines().is_empty() {
        String::new()
    } else {
        "#text(size: 9pt, fill: rgb(\"#a94442\"))[Some lines are entered in another currency. \
         Amounts are summed without conversion.]"
            .to_string()
    };

    // Show the rates the totals were computed with, not raw stored values
    let tax = sheet.tax.sanitized();

    SHEET_TEMPLATE
        .replace("{{SHEET_NAME}}", &escape_typst(&sheet.name))
        .replace("{{PREPARED_BY}}", &escape_typst(prepared_by))
        .replace("{{DATE}}", &Utc::now().format("%Y-%m-%d").to_string())
        .replace("{{MODIFIED}}", &sheet.modified.format("%Y-%m-%d %H:%M UTC").to_string())
        .replace("{{CURRENCY}}", sheet.currency.code())
        .replace("{{MATERIAL_ROWS}}", &material_rows(sheet))
        .replace("{{LABOR_ROWS}}", &labor_rows(sheet))
        .replace("{{OVERHEAD_ROWS}}", &overhead_rows(sheet))
        .replace("{{TOTAL_MATERIAL}}", &money(summary.total_material_cost))
        .replace("{{TOTAL_LABOR}}", &money(summary.total_labor_cost))
        .replace("{{TOTAL_OVERHEAD}}", &money(summary.total_overhead_cost))
        .replace("{{SUBTOTAL}}", &money(summary.subtotal))
        .replace("{{VAT}}", &format!("{:.2}", tax.vat_rate))
        .replace("{{CUSTOMS}}", &format!("{:.2}", tax.customs_duty))
        .replace("{{OTHER}}", &format!("{:.2}", tax.other_taxes))
        .replace("{{TOTAL_TAX}}", &money(summary.total_tax))
        .replace("{{TOTAL_COST}}", &money(summary.total_cost))
        .replace("{{MARGIN}}", &format!("{:.2}", sanitize_amount(sheet.profit_margin)))
        .replace("{{PROFIT}}", &money(summary.profit_amount))
        .replace("{{SELLING_PRICE}}", &money(summary.selling_price))
        .replace("{{CURRENCY_NOTE}}", &currency_note)
}

fn line_money(currency: Currency, amount: f64) -> String {
    escape_typst(&currency.format_amount(amount))
}

fn empty_row(columns: usize) -> String {
    let mut cells = vec!["[_none_]".to_string()];
    cells.extend(std::iter::repeat("[]".to_string()).take(columns - 1));
    format!("  {},", cells.join(", "))
}

fn material_rows(sheet: &CostingSheet) -> String {
    if sheet.breakdown.materials.is_empty() {
        return empty_row(5);
    }
    sheet
        .breakdown
        .materials
        .iter()
        .map(|line| {
            format!(
                "  [{}], [{}], [{:.2} {}], [{}], [{}],",
                escape_typst(&line.name),
                escape_typst(line.supplier.as_deref().unwrap_or("-")),
                sanitize_amount(line.quantity),
                escape_typst(&line.unit),
                line_money(line.currency, sanitize_amount(line.unit_cost)),
                line_money(line.currency, line.total()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn labor_rows(sheet: &CostingSheet) -> String {
    if sheet.breakdown.labor.is_empty() {
        return empty_row(4);
    }
    sheet
        .breakdown
        .labor
        .iter()
        .map(|line| {
            format!(
                "  [{}], [{:.1}], [{}], [{}],",
                escape_typst(&line.operation),
                sanitize_amount(line.time_minutes),
                line_money(line.currency, sanitize_amount(line.rate_per_hour)),
                line_money(line.currency, line.total()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn overhead_rows(sheet: &CostingSheet) -> String {
    if sheet.breakdown.overheads.is_empty() {
        return empty_row(4);
    }
    let summary = sheet.summary();
    let base = BaseCost::new(summary.total_material_cost, summary.total_labor_cost);
    sheet
        .breakdown
        .overheads
        .iter()
        .map(|line| {
            let amount = sanitize_amount(line.amount);
            let amount = match line.kind {
                OverheadKind::Fixed => line_money(line.currency, amount),
                OverheadKind::Percentage => format!("{:.2}%", amount),
            };
            format!(
                "  [{}], [{}], [{}], [{}],",
                escape_typst(&line.category),
                line.kind,
                amount,
                line_money(line.currency, overhead_contribution(line, base)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{FieldValue, LineField, LineKind};
    use crate::sheet::TaxConfiguration;

    fn report_sheet() -> CostingSheet {
        let mut sheet = CostingSheet::new("Chore coat #2");
        sheet
            .add_line(
                LineKind::Material,
                &[
                    (LineField::Name, FieldValue::Text("Canvas".into())),
                    (LineField::Unit, FieldValue::Text("meters".into())),
                    (LineField::Quantity, FieldValue::Number(10.0)),
                    (LineField::UnitCost, FieldValue::Number(5.0)),
                ],
            )
            .unwrap();
        sheet
            .add_line(
                LineKind::Overhead,
                &[
                    (LineField::Category, FieldValue::Text("Factory".into())),
                    (LineField::OverheadKind, FieldValue::OverheadKind(OverheadKind::Percentage)),
                    (LineField::Amount, FieldValue::Number(10.0)),
                ],
            )
            .unwrap();
        sheet.set_tax(TaxConfiguration::new(10.0, 0.0, 0.0));
        sheet.set_profit_margin(20.0);
        sheet
    }

    #[test]
    fn test_source_contains_figures() {
        let source = build_source(&report_sheet(), "QA");
        assert!(source.contains("Chore coat \\#2"));
        assert!(source.contains("[Canvas], [-], [10.00 meters], [\\$5.00], [\\$50.00],"));
        assert!(source.contains("[Factory], [PERCENTAGE], [10.00%], [\\$5.00],"));
        // subtotal 55, tax 5.5, cogs 60.5, price 72.6
        assert!(source.contains("[*\\$55.00*]"));
        assert!(source.contains("Selling price: \\$72.60"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_empty_tables_have_placeholder_row() {
        let source = build_source(&CostingSheet::new("Blank"), "QA");
        assert!(source.contains("[_none_], [], [], [],"));
    }

    #[test]
    fn test_invalid_stored_rates_print_as_applied() {
        let mut sheet = report_sheet();
        sheet.tax.vat_rate = -5.0;
        sheet.profit_margin = -10.0;
        sheet.breakdown.overheads[0].amount = -3.0;

        let source = build_source(&sheet, "QA");
        assert!(source.contains("VAT 0.00%"));
        assert!(source.contains("Profit margin 0.00%"));
        assert!(source.contains("[Factory], [PERCENTAGE], [0.00%], [\\$0.00],"));
        assert!(!source.contains("-5.00") && !source.contains("-10.00"));
    }

    #[test]
    fn test_escape_typst() {
        assert_eq!(escape_typst("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_typst("[x]"), "\\[x\\]");
    }

    #[test]
    fn test_pdf_generation() {
        let pdf = render_sheet_pdf(&report_sheet(), "Test Merchandiser");
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let pdf_bytes = pdf.unwrap();
        assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        assert!(pdf_bytes.len() > 1000, "PDF seems too small");
    }
}
