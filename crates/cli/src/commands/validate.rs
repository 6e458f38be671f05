//! Validate Command

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pipecheck_validator::{Severity, ValidationReport};

use crate::commands::load_config;
use crate::output::{print_fields, print_json, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct ValidateArgs {
    /// CSV uploaded to the app [default: <data_dir>/input.csv]
    pub input: Option<PathBuf>,

    /// CSV downloaded from the app [default: <data_dir>/output.csv]
    pub output: Option<PathBuf>,
}

/// Findings never fail the command; only a missing or malformed file does
pub fn execute(args: ValidateArgs, config_path: &Path, format: OutputFormat) -> Result<bool> {
    let config = load_config(config_path)?;
    let input = args.input.unwrap_or_else(|| config.input_csv());
    let output = args.output.unwrap_or_else(|| config.output_csv());

    let report = pipecheck_validator::validate(&input, &output)?;
    print_report(&report, format);
    Ok(true)
}

pub fn print_report(report: &ValidationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            print_fields(&[
                ("Input Rows", report.input_rows.to_string()),
                ("Output Rows", report.output_rows.to_string()),
                ("Input Cols", report.input_columns.join(", ")),
                ("Output Cols", report.output_columns.join(", ")),
                ("Duplicate Rows", report.duplicate_rows.to_string()),
            ]);
            for finding in &report.findings {
                match finding.severity {
                    Severity::Pass => print_success(&finding.message),
                    Severity::Warning => print_warning(&finding.message),
                }
            }
        }
        OutputFormat::Plain => {
            println!("Input Rows: {}", report.input_rows);
            println!("Output Rows: {}", report.output_rows);
            println!("Schema Check:");
            println!("Input Cols: {:?}", report.input_columns);
            println!("Output Cols: {:?}", report.output_columns);
            for finding in &report.findings {
                match finding.severity {
                    Severity::Pass => println!("{} {}", "PASS:".green(), finding.message),
                    Severity::Warning => println!("{} {}", "WARNING:".yellow(), finding.message),
                }
            }
            println!("Validation Complete.");
        }
    }
}
