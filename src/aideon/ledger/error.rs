use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type covering the different failure cases that can occur while the
/// ledger locates, extracts, reconciles, or analyses its source workbooks.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrapper for IO failures such as reading directories or metadata.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the YAML configuration cannot be parsed.
    #[error("configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors bubbled up from the workbook reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    /// Raised when a configured file pattern is not a valid glob.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// No file matched the pattern in any of the searched locations.
    #[error("no file matching '{pattern}' found in {}", display_paths(.searched))]
    SourceNotFound {
        pattern: String,
        searched: Vec<PathBuf>,
    },

    /// The configured layout does not fit the workbook's cell matrix.
    #[error("extraction failed{}{}: {detail}", display_path(.path), display_row(.row))]
    Extraction {
        path: Option<PathBuf>,
        row: Option<usize>,
        detail: String,
    },

    /// The costs table columns do not line up with the configured branches.
    #[error("schema mismatch{}: expected {expected} columns, found {found}: {detail}", display_path(.path))]
    SchemaMismatch {
        path: Option<PathBuf>,
        expected: usize,
        found: usize,
        detail: String,
    },

    /// Revenue and cost facts could not be joined consistently.
    #[error("reconciliation failed for period {period}, branch '{branch}': {detail}")]
    Reconciliation {
        period: u32,
        branch: String,
        detail: String,
    },

    /// Raised when the configuration is structurally valid YAML but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl LedgerError {
    /// Attaches the offending source file to extraction and schema errors
    /// raised by the path-agnostic table stages.
    pub fn with_path(self, source: &Path) -> Self {
        match self {
            LedgerError::Extraction { path: None, row, detail } => LedgerError::Extraction {
                path: Some(source.to_path_buf()),
                row,
                detail,
            },
            LedgerError::SchemaMismatch {
                path: None,
                expected,
                found,
                detail,
            } => LedgerError::SchemaMismatch {
                path: Some(source.to_path_buf()),
                expected,
                found,
                detail,
            },
            other => other,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

fn display_row(row: &Option<usize>) -> String {
    row.map(|row| format!(" at row {row}")).unwrap_or_default()
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search locations".to_string();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
