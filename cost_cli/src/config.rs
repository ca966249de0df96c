//! Command-line arguments and environment configuration.
//!
//! Every global option can also come from an environment variable (or a
//! `.env` file next to where the CLI runs), so a shared sheet directory can
//! be configured once per machine.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cost_core::{Currency, LineField, LineKind};

#[derive(Parser, Debug)]
#[command(name = "stitchcost")]
#[command(version, about = "Garment costing sheets: materials, labor, overheads, tax and selling price")]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CliConfig {
    /// Directory holding the .csf sheet files
    #[arg(long, env = "STITCHCOST_SHEETS_DIR", value_name = "DIR", default_value = "sheets", global = true)]
    pub sheets_dir: PathBuf,

    /// Name recorded in lock files while writing
    #[arg(long, env = "STITCHCOST_USER", default_value = "stitchcost", global = true)]
    pub user: String,

    /// Log filter when RUST_LOG is not set (e.g. "info", "cost_core=debug")
    #[arg(long, env = "STITCHCOST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty sheet
    New {
        /// Sheet name (defaults to "New Sheet")
        name: Option<String>,
        #[arg(long)]
        currency: Option<Currency>,
        /// Profit margin in percent
        #[arg(long)]
        margin: Option<f64>,
    },
    /// List stored sheets
    List,
    /// Show a sheet's lines and derived values
    Show { sheet: String },
    /// Report inputs the calculator will treat as zero
    Check { sheet: String },
    /// Add a line; fields given as --set field=value
    Add {
        sheet: String,
        kind: LineKind,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(LineField, String)>,
    },
    /// Change one field of one line
    Update {
        sheet: String,
        kind: LineKind,
        /// Line id or unique id prefix
        line: String,
        field: LineField,
        value: String,
    },
    /// Remove a line
    Remove {
        sheet: String,
        kind: LineKind,
        /// Line id or unique id prefix
        line: String,
    },
    /// Set tax rates in percent; omitted rates keep their value
    Tax {
        sheet: String,
        #[arg(long)]
        vat: Option<f64>,
        #[arg(long)]
        customs: Option<f64>,
        #[arg(long)]
        other: Option<f64>,
    },
    /// Set the profit margin in percent
    Margin { sheet: String, percent: f64 },
    /// Set the currency for new lines
    Currency { sheet: String, currency: Currency },
    /// Rename a sheet
    Rename { sheet: String, name: String },
    /// Copy a sheet into a new one named "New Sheet"
    Clone { sheet: String },
    /// Delete a sheet
    Delete { sheet: String },
    /// Render a PDF costing report
    Report {
        sheet: String,
        /// Output file (defaults to <sheet name>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        prepared_by: Option<String>,
    },
}

/// Parse `field=value` for `--set`.
fn parse_assignment(raw: &str) -> Result<(LineField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))?;
    let field: LineField = field.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((field, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        let (field, value) = parse_assignment("unit_cost=4.5").unwrap();
        assert_eq!(field, LineField::UnitCost);
        assert_eq!(value, "4.5");

        assert!(parse_assignment("quantity").is_err());
        assert!(parse_assignment("colour=red").is_err());
    }

    #[test]
    fn test_add_command_parses() {
        let cli = Cli::try_parse_from([
            "stitchcost",
            "--sheets-dir",
            "/tmp/sheets",
            "add",
            "jacket",
            "material",
            "--set",
            "name=Denim",
            "--set",
            "quantity=10",
        ])
        .unwrap();
        assert_eq!(cli.config.sheets_dir, PathBuf::from("/tmp/sheets"));
        match cli.command {
            Command::Add { sheet, kind, set } => {
                assert_eq!(sheet, "jacket");
                assert_eq!(kind, LineKind::Material);
                assert_eq!(set.len(), 2);
                assert_eq!(set[1], (LineField::Quantity, "10".to_string()));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
