//! Error types for CSV validation

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Which side of the comparison a file is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Input,
    Output,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Input => write!(f, "input"),
            FileRole::Output => write!(f, "output"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{role} file not found: {}", .path.display())]
    MissingFile { role: FileRole, path: PathBuf },

    #[error("failed to read {role} file {}: {source}", .path.display())]
    Io {
        role: FileRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {role} file {}: {source}", .path.display())]
    Parse {
        role: FileRole,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ValidationError {
    pub fn role(&self) -> FileRole {
        match self {
            ValidationError::MissingFile { role, .. }
            | ValidationError::Io { role, .. }
            | ValidationError::Parse { role, .. } => *role,
        }
    }
}
