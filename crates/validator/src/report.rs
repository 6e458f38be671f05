//! Validation report

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    Warning,
}

/// A single advisory finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn pass(check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: Severity::Pass,
            message: message.into(),
        }
    }

    pub fn warning(check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Outcome of comparing an output CSV with its input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub input_columns: Vec<String>,
    pub output_columns: Vec<String>,
    /// Output column count minus input column count
    pub column_delta: i64,
    /// Output rows beyond the first occurrence of each distinct row
    pub duplicate_rows: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn lost_columns(&self) -> bool {
        self.column_delta < 0
    }
}
