//! CSV validation for pipeline output
//!
//! Loads the CSV that was uploaded to the app and the CSV it produced, then
//! reports row counts, a schema comparison and the number of exact duplicate
//! rows left in the output. Findings are advisory: only a missing file or a
//! malformed CSV is an error.

pub mod checks;
pub mod error;
pub mod report;
pub mod table;

pub use error::{FileRole, ValidationError, ValidationResult};
pub use report::{Finding, Severity, ValidationReport};
pub use table::{CsvTable, Record};

use std::path::Path;
use tracing::{debug, info};

/// Validate `output` against `input`.
///
/// Both files are checked for existence before either one is parsed.
pub fn validate(input: &Path, output: &Path) -> ValidationResult<ValidationReport> {
    ensure_exists(FileRole::Input, input)?;
    ensure_exists(FileRole::Output, output)?;

    info!(
        "Validating {} against {}",
        file_name(output),
        file_name(input)
    );

    let input_table = CsvTable::from_path(FileRole::Input, input)?;
    let output_table = CsvTable::from_path(FileRole::Output, output)?;

    debug!(
        input_rows = input_table.len(),
        output_rows = output_table.len(),
        "Parsed both files"
    );

    Ok(checks::run_all(&input_table, &output_table))
}

fn ensure_exists(role: FileRole, path: &Path) -> ValidationResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ValidationError::MissingFile {
            role,
            path: path.to_path_buf(),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
