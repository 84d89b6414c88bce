//! Report-layer errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::dictionary::DedError;

/// Result type used across the report layer.
pub type ReportResult<T> = Result<T, ReportError>;

/// Failures that abort a command. Skipped rows and noise values are not errors.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("workbook directory not found: {}", .0.display())]
    WorkbookNotFound(PathBuf),

    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("the data element dictionary worksheet '{0}' does not exist; create it first")]
    DedSheetMissing(String),

    #[error("data element dictionary: {0}")]
    Ded(#[from] DedError),

    #[error("worksheet '{sheet}': none of its columns map to an identifier data element")]
    NoIdentifierColumns { sheet: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("worksheet '{sheet}': {source}")]
    Csv {
        sheet: String,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(sheet: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            sheet: sheet.into(),
            source,
        }
    }
}
