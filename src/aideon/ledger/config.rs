use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aideon::ledger::costs::DEFAULT_HEADER_ROW;
use crate::aideon::ledger::error::{LedgerError, Result};
use crate::aideon::ledger::extract::{ColumnLayout, LayoutStrategy};
use crate::aideon::ledger::insight::InsightThresholds;
use crate::aideon::ledger::model::Branch;
use crate::aideon::ledger::reconcile::ReconcileOptions;

/// Memoization window applied when the configuration does not set one.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Top-level configuration, usually loaded from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub client: ClientConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub thresholds: InsightThresholds,
    #[serde(default)]
    pub reconcile: ReconcileOptions,
    /// Directory relative search paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Where the two source workbooks live and how they are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Ordered branch list; the order fixes column positions in both tables.
    pub branches: Vec<Branch>,
    pub revenue_file_pattern: String,
    pub costs_file_pattern: String,
    /// Directories searched in priority order.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
    pub revenue_layout: LayoutStrategy,
    #[serde(default)]
    pub columns: ColumnLayout,
    #[serde(default = "default_header_row")]
    pub costs_header_row: usize,
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("data")]
}

fn default_header_row() -> usize {
    DEFAULT_HEADER_ROW
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl LedgerConfig {
    /// Loads and validates a YAML configuration file. Relative search paths
    /// resolve against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LedgerError::MissingInput(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&source)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        debug!(path = %path.display(), branches = config.data.branches.len(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let config: LedgerConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        if data.branches.is_empty() {
            return Err(invalid("data.branches must list at least one branch"));
        }
        let mut seen = HashSet::new();
        for branch in &data.branches {
            if branch.trim().is_empty() {
                return Err(invalid("data.branches contains a blank name"));
            }
            if !seen.insert(branch.as_str()) {
                return Err(invalid(&format!("branch '{branch}' is listed twice")));
            }
        }
        if data.revenue_file_pattern.trim().is_empty() || data.costs_file_pattern.trim().is_empty() {
            return Err(invalid("file patterns must not be empty"));
        }
        if data.search_paths.is_empty() {
            return Err(invalid("data.search_paths must not be empty"));
        }
        if let LayoutStrategy::FixedRange {
            revenue_rows,
            hours_rows,
        } = &data.revenue_layout
        {
            if revenue_rows.is_empty() || hours_rows.is_empty() {
                return Err(invalid("row ranges must have start <= end"));
            }
            if revenue_rows.overlaps(hours_rows) {
                return Err(invalid("revenue and hours row ranges overlap"));
            }
        }
        if let LayoutStrategy::MarkerScan { sentinel, .. } = &data.revenue_layout {
            if sentinel.trim().is_empty() {
                return Err(invalid("marker sentinel must not be empty"));
            }
        }
        Ok(())
    }

    /// Search locations in priority order, with relative entries resolved
    /// against the configuration file's directory.
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        self.data
            .search_paths
            .iter()
            .map(|path| match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })
            .collect()
    }
}

fn invalid(message: &str) -> LedgerError {
    LedgerError::InvalidConfig(message.to_string())
}
