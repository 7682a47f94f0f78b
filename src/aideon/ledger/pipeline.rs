use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::aideon::ledger::cache::MemoCache;
use crate::aideon::ledger::config::{DataConfig, LedgerConfig};
use crate::aideon::ledger::costs::normalize_costs;
use crate::aideon::ledger::error::Result;
use crate::aideon::ledger::extract::extract_revenue;
use crate::aideon::ledger::io::excel_read::read_first_sheet;
use crate::aideon::ledger::io::locate::{SourceFile, locate_latest};
use crate::aideon::ledger::model::{CellGrid, FactTable, Selection};
use crate::aideon::ledger::reconcile::{ReconcileOptions, reconcile};
use crate::aideon::ledger::report::{self, Analysis};

/// The two resolved source workbooks. Together with their modification
/// times they identify one version of the input and key the fact cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePair {
    pub revenue: SourceFile,
    pub costs: SourceFile,
}

/// Structured output consumed by rendering collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub client: String,
    pub revenue_file: String,
    pub costs_file: String,
    pub generated_at: DateTime<Utc>,
    pub selection: Selection,
    pub fact_count: usize,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// Builds the fact table from two in-memory grids.
pub fn facts_from_grids(
    revenue_grid: &CellGrid,
    cost_grid: &CellGrid,
    data: &DataConfig,
    options: ReconcileOptions,
) -> Result<FactTable> {
    let revenue = extract_revenue(
        revenue_grid,
        &data.branches,
        &data.revenue_layout,
        &data.columns,
    )?;
    let costs = normalize_costs(cost_grid, data.costs_header_row, &data.branches)?;
    reconcile(revenue, &costs, options)
}

/// Reads both workbooks and builds the fact table, attaching the offending
/// file to any extraction or schema error.
#[instrument(
    level = "info",
    skip_all,
    fields(revenue = %sources.revenue.path.display(), costs = %sources.costs.path.display())
)]
pub fn build_fact_table(config: &LedgerConfig, sources: &SourcePair) -> Result<FactTable> {
    let data = &config.data;
    let revenue_path = &sources.revenue.path;
    let costs_path = &sources.costs.path;

    let revenue_grid = read_first_sheet(revenue_path)?;
    let revenue = extract_revenue(
        &revenue_grid,
        &data.branches,
        &data.revenue_layout,
        &data.columns,
    )
    .map_err(|error| error.with_path(revenue_path))?;
    info!(rows = revenue.len(), "extracted revenue rows");

    let cost_grid = read_first_sheet(costs_path)?;
    let costs = normalize_costs(&cost_grid, data.costs_header_row, &data.branches)
        .map_err(|error| error.with_path(costs_path))?;
    info!(rows = costs.len(), "normalized cost rows");

    let facts = reconcile(revenue, &costs, config.reconcile)?;
    info!(facts = facts.len(), "fact table built");
    Ok(facts)
}

/// Locates, extracts, reconciles and analyses the source workbooks.
///
/// Fact tables are memoized per [`SourcePair`] for the configured TTL, so
/// repeated calls against unchanged files skip re-parsing.
pub struct Pipeline {
    config: LedgerConfig,
    cache: MemoCache<SourcePair, FactTable>,
}

impl Pipeline {
    pub fn new(config: LedgerConfig) -> Self {
        let cache = MemoCache::new(config.cache.ttl());
        Self { config, cache }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Resolves the latest revenue and costs workbooks.
    #[instrument(level = "debug", skip(self))]
    pub fn locate(&self) -> Result<SourcePair> {
        let search_paths = self.config.resolved_search_paths();
        let revenue = locate_latest(&self.config.data.revenue_file_pattern, &search_paths)?;
        let costs = locate_latest(&self.config.data.costs_file_pattern, &search_paths)?;
        Ok(SourcePair { revenue, costs })
    }

    /// Returns the fact table for the current source files, reusing a
    /// memoized table when the files are unchanged.
    pub fn facts(&self) -> Result<(SourcePair, Arc<FactTable>)> {
        let sources = self.locate()?;
        let facts = self
            .cache
            .get_or_try_insert_with(&sources, || build_fact_table(&self.config, &sources))?;
        Ok((sources, facts))
    }

    /// Discards memoized tables and rebuilds from the current files.
    pub fn refresh(&self) -> Result<(SourcePair, Arc<FactTable>)> {
        self.invalidate();
        self.facts()
    }

    /// Discards every memoized table.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Runs the full analysis over the selected part of the fact table.
    #[instrument(level = "info", skip_all)]
    pub fn analyze(&self, selection: &Selection) -> Result<AnalysisReport> {
        let (sources, facts) = self.facts()?;
        let selected = facts.select(selection);
        let analysis = report::analyze(&selected, &self.config.thresholds);
        info!(
            facts = selected.len(),
            risks = analysis.insights.risks.len(),
            opportunities = analysis.insights.opportunities.len(),
            "analysis complete"
        );
        Ok(AnalysisReport {
            client: self.config.client.name.clone(),
            revenue_file: sources.revenue.file_name(),
            costs_file: sources.costs.file_name(),
            generated_at: Utc::now(),
            selection: selection.clone(),
            fact_count: selected.len(),
            analysis,
        })
    }
}
