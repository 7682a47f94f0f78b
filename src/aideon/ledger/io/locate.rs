use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::aideon::ledger::error::{LedgerError, Result};

/// A resolved source workbook together with the modification time observed
/// when it was located. The pair identifies one version of the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SourceFile {
    /// File name without its directory, used in report headers.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Resolves the most recently modified file matching `pattern`.
///
/// Directories are searched in priority order and the first one holding at
/// least one match wins, even if a later directory has a newer file. Ties on
/// modification time go to the lexicographically greatest path.
#[instrument(level = "debug", skip(search_paths), fields(pattern = %pattern))]
pub fn locate_latest(pattern: &str, search_paths: &[PathBuf]) -> Result<SourceFile> {
    Pattern::new(pattern)?;

    for directory in search_paths {
        if !directory.is_dir() {
            debug!(directory = %directory.display(), "search location missing, skipping");
            continue;
        }
        let candidates = matching_files(directory, pattern)?;
        let latest = candidates
            .into_iter()
            .max_by(|lhs, rhs| {
                lhs.modified
                    .cmp(&rhs.modified)
                    .then_with(|| lhs.path.cmp(&rhs.path))
            });
        if let Some(found) = latest {
            debug!(path = %found.path.display(), "resolved source file");
            return Ok(found);
        }
        debug!(directory = %directory.display(), "no match in search location");
    }

    Err(LedgerError::SourceNotFound {
        pattern: pattern.to_string(),
        searched: search_paths.to_vec(),
    })
}

fn matching_files(directory: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    let full_pattern = format!(
        "{}/{}",
        Pattern::escape(&directory.to_string_lossy()),
        pattern
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for entry in glob::glob_with(&full_pattern, options)? {
        let path = entry.map_err(|error| LedgerError::Io(error.into_error()))?;
        let metadata = fs::metadata(&path)?;
        if !metadata.is_file() {
            continue;
        }
        files.push(SourceFile {
            modified: metadata.modified()?,
            path,
        });
    }
    Ok(files)
}
