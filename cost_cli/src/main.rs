//! Stitchcost CLI
//!
//! Create and edit garment costing sheets stored as `.csf` files.

mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use cost_core::CostError;

use config::Cli;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.config.log_level);

    match commands::run(&cli.config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);

            if let Some(cost_error) = e.downcast_ref::<CostError>() {
                if cost_error.is_recoverable() {
                    eprintln!("(retry may succeed)");
                }
                if cli.config.json {
                    if let Ok(json) = serde_json::to_string_pretty(cost_error) {
                        eprintln!("Error JSON:");
                        eprintln!("{}", json);
                    }
                }
            }
            ExitCode::FAILURE
        }
    }
}
