//! CSV loading into header-keyed records

use indexmap::IndexMap;
use std::path::Path;

use crate::error::{FileRole, ValidationError, ValidationResult};

/// One data row, keyed by column name in header order
pub type Record = IndexMap<String, String>;

const UTF8_BOM: char = '\u{feff}';

/// A parsed CSV file: its header and its data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl CsvTable {
    /// Read and parse a CSV file whose first row is the header
    pub fn from_path(role: FileRole, path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
            role,
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ValidationError::Parse {
            role,
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse CSV text. Empty lines are skipped; rows whose field count differs
    /// from the header are rejected.
    pub fn parse(content: &str) -> Result<Self, csv::Error> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        // A repeated header name keeps its first position; the later cell wins.
        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for name in &headers {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::with_capacity(columns.len());
            for (name, value) in headers.iter().zip(row.iter()) {
                record.insert(name.clone(), value.to_string());
            }
            records.push(record);
        }

        Ok(Self { columns, records })
    }

    /// Column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of data rows (header excluded)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
