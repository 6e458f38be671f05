//! Individual checks. Each one is independent and only ever produces
//! findings, never errors.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::report::{Finding, ValidationReport};
use crate::table::{CsvTable, Record};

pub const SCHEMA_CHECK: &str = "schema";
pub const DUPLICATE_CHECK: &str = "duplicates";

/// Run every check and assemble the report
pub fn run_all(input: &CsvTable, output: &CsvTable) -> ValidationReport {
    let mut findings = Vec::new();

    findings.extend(schema_check(input.columns(), output.columns()));

    let duplicate_rows = count_duplicates(output.records());
    findings.push(duplicate_finding(duplicate_rows));

    ValidationReport {
        input_rows: input.len(),
        output_rows: output.len(),
        input_columns: input.columns().to_vec(),
        output_columns: output.columns().to_vec(),
        column_delta: output.columns().len() as i64 - input.columns().len() as i64,
        duplicate_rows,
        findings,
    }
}

/// Warn only when the output lost columns. Extra, reordered or renamed
/// columns pass silently.
pub fn schema_check(input: &[String], output: &[String]) -> Option<Finding> {
    if output.len() < input.len() {
        warn!(
            input_columns = input.len(),
            output_columns = output.len(),
            "Output has fewer columns than input"
        );
        Some(Finding::warning(
            SCHEMA_CHECK,
            format!(
                "Output has fewer columns than input ({} < {})",
                output.len(),
                input.len()
            ),
        ))
    } else {
        None
    }
}

/// Number of rows that exactly repeat an earlier row across all columns
pub fn count_duplicates(records: &[Record]) -> usize {
    let distinct: HashSet<String> = records.iter().map(canonical_key).collect();
    debug!(rows = records.len(), distinct = distinct.len(), "Duplicate scan");
    records.len() - distinct.len()
}

fn duplicate_finding(duplicates: usize) -> Finding {
    if duplicates == 0 {
        Finding::pass(DUPLICATE_CHECK, "No duplicate rows found in output.")
    } else {
        warn!(duplicates, "Output contains duplicate rows");
        Finding::warning(
            DUPLICATE_CHECK,
            format!("Output contains {} duplicates.", duplicates),
        )
    }
}

/// JSON object over the full field set, in header order.
/// String-keyed maps of strings always serialize.
fn canonical_key(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    fn table(csv: &str) -> CsvTable {
        CsvTable::parse(csv).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_warns_only_on_fewer_columns() {
        assert!(schema_check(&cols(&["a", "b"]), &cols(&["a"])).is_some());
        assert!(schema_check(&cols(&["a", "b"]), &cols(&["b", "a"])).is_none());
        assert!(schema_check(&cols(&["a", "b"]), &cols(&["x", "y"])).is_none());
        assert!(schema_check(&cols(&["a"]), &cols(&["a", "b"])).is_none());
    }

    #[test]
    fn test_duplicates_are_exact_matches_across_all_columns() {
        let t = table("Name,email\nAlice,a@x.com\nAlice,A@x.com\nAlice,a@x.com\n");
        assert_eq!(count_duplicates(t.records()), 1);
    }

    #[test]
    fn test_separator_inside_values_does_not_collide() {
        let t = table("a,b\n\"x,y\",z\nx,\"y,z\"\n");
        assert_eq!(count_duplicates(t.records()), 0);
    }

    #[test]
    fn test_run_all_example() {
        let input = table("Name,email\nAlice,a@x.com\nAlice,a@x.com\nBob,b@x.com\n");
        let output = table("Name,email\nAlice,a@x.com\nBob,b@x.com\n");
        let report = run_all(&input, &output);

        assert_eq!(report.input_rows, 3);
        assert_eq!(report.output_rows, 2);
        assert_eq!(report.duplicate_rows, 0);
        assert_eq!(report.column_delta, 0);
        assert!(!report.has_warnings());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, Severity::Pass);
    }

    #[test]
    fn test_input_duplicates_are_ignored() {
        let input = table("id\n1\n1\n1\n");
        let output = table("id\n1\n");
        assert_eq!(run_all(&input, &output).duplicate_rows, 0);
    }

    #[test]
    fn test_dropped_column_and_duplicates_both_reported() {
        let input = table("id,name,email\n1,a,a@x\n");
        let output = table("id,name\n1,a\n1,a\n1,a\n");
        let report = run_all(&input, &output);

        assert_eq!(report.column_delta, -1);
        assert!(report.lost_columns());
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.warnings().count(), 2);
    }
}
