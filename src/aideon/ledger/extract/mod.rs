//! Positional extraction of revenue and hours facts from the revenue
//! workbook's raw cell matrix.
//!
//! Two layouts are supported and selected once per run through
//! [`LayoutStrategy`]: fixed, row-aligned revenue and hours sections, or a
//! scan for period total rows marked by a sentinel label. Both share the same
//! filtering policy: a branch cell only yields a row when it coerces to a
//! strictly positive number, and rows without a usable period label are
//! skipped. Neither case is an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::aideon::ledger::error::{LedgerError, Result};
use crate::aideon::ledger::model::grid::{label_text, parse_int_prefix, try_parse_number};
use crate::aideon::ledger::model::{Branch, CellGrid, Period, RevenueRow};

/// Label that marks a period total row in the marker-scan layout.
pub const DEFAULT_SENTINEL: &str = "TOTAL";

/// Inclusive, zero-based row span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn overlaps(&self, other: &RowRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// How the revenue workbook lays out its per-branch values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Two row-aligned sections: row `revenue_rows.start + i` and
    /// `hours_rows.start + i` describe the same period.
    FixedRange {
        revenue_rows: RowRange,
        hours_rows: RowRange,
    },
    /// Every row whose label column equals the sentinel (case-insensitive)
    /// is a period total. No hours are available in this layout.
    MarkerScan {
        #[serde(default = "default_sentinel")]
        sentinel: String,
        #[serde(default)]
        label_column: usize,
        #[serde(default = "default_period_column")]
        period_column: usize,
    },
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_period_column() -> usize {
    1
}

/// Column positions shared by both layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Column holding the period label in the fixed-range layout.
    #[serde(default = "default_period_column")]
    pub period: usize,
    #[serde(default = "default_date_range_column")]
    pub date_range: Option<usize>,
    /// Column of the first configured branch; branch `i` sits at
    /// `first_branch + i`.
    #[serde(default = "default_first_branch_column")]
    pub first_branch: usize,
}

fn default_date_range_column() -> Option<usize> {
    Some(2)
}

fn default_first_branch_column() -> usize {
    3
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            period: default_period_column(),
            date_range: default_date_range_column(),
            first_branch: default_first_branch_column(),
        }
    }
}

/// Extracts revenue rows from the grid using the configured layout.
///
/// Fails only when a configured row range does not fit inside the grid.
#[instrument(level = "debug", skip(grid, branches, columns), fields(rows = grid.height()))]
pub fn extract_revenue(
    grid: &CellGrid,
    branches: &[Branch],
    strategy: &LayoutStrategy,
    columns: &ColumnLayout,
) -> Result<Vec<RevenueRow>> {
    let rows = match strategy {
        LayoutStrategy::FixedRange {
            revenue_rows,
            hours_rows,
        } => extract_fixed_range(grid, branches, *revenue_rows, *hours_rows, columns)?,
        LayoutStrategy::MarkerScan {
            sentinel,
            label_column,
            period_column,
        } => extract_marker_rows(grid, branches, sentinel, *label_column, *period_column, columns),
    };
    debug!(extracted = rows.len(), "revenue rows extracted");
    Ok(rows)
}

fn extract_fixed_range(
    grid: &CellGrid,
    branches: &[Branch],
    revenue_rows: RowRange,
    hours_rows: RowRange,
    columns: &ColumnLayout,
) -> Result<Vec<RevenueRow>> {
    check_bounds(grid, revenue_rows, "revenue")?;
    check_bounds(grid, hours_rows, "hours")?;

    let mut rows = Vec::new();
    for offset in 0..revenue_rows.len() {
        let row = revenue_rows.start + offset;
        let hours_row = Some(hours_rows.start + offset).filter(|row| *row <= hours_rows.end);

        let Some((period, date_range)) = read_period(grid, row, columns.period, columns) else {
            continue;
        };

        for (index, branch) in branches.iter().enumerate() {
            let column = columns.first_branch + index;
            let Some(revenue) = positive_number(grid, row, column) else {
                continue;
            };
            let hours = hours_row
                .and_then(|hours_row| positive_number(grid, hours_row, column))
                .unwrap_or(0.0);
            rows.push(RevenueRow {
                period,
                branch: branch.clone(),
                revenue,
                hours,
                date_range: date_range.clone(),
            });
        }
    }
    Ok(rows)
}

fn extract_marker_rows(
    grid: &CellGrid,
    branches: &[Branch],
    sentinel: &str,
    label_column: usize,
    period_column: usize,
    columns: &ColumnLayout,
) -> Vec<RevenueRow> {
    let mut rows = Vec::new();
    for row in 0..grid.height() {
        let label = grid.get(row, label_column).as_text();
        if !label.trim().eq_ignore_ascii_case(sentinel) {
            continue;
        }
        let Some((period, date_range)) = read_period(grid, row, period_column, columns) else {
            continue;
        };
        for (index, branch) in branches.iter().enumerate() {
            let Some(revenue) = positive_number(grid, row, columns.first_branch + index) else {
                continue;
            };
            rows.push(RevenueRow {
                period,
                branch: branch.clone(),
                revenue,
                hours: 0.0,
                date_range: date_range.clone(),
            });
        }
    }
    rows
}

fn check_bounds(grid: &CellGrid, range: RowRange, section: &str) -> Result<()> {
    if range.is_empty() {
        return Err(LedgerError::Extraction {
            path: None,
            row: Some(range.start),
            detail: format!(
                "{section} section starts at row {} after it ends at row {}",
                range.start, range.end
            ),
        });
    }
    if range.end >= grid.height() {
        return Err(LedgerError::Extraction {
            path: None,
            row: Some(range.end),
            detail: format!(
                "{section} section rows {}..={} exceed the sheet's {} rows",
                range.start,
                range.end,
                grid.height()
            ),
        });
    }
    Ok(())
}

fn read_period(
    grid: &CellGrid,
    row: usize,
    period_column: usize,
    columns: &ColumnLayout,
) -> Option<(Period, Option<String>)> {
    let Some(label) = label_text(grid.get(row, period_column)) else {
        debug!(row, "skipping row without a period label");
        return None;
    };
    let Some(period) = parse_int_prefix(&label) else {
        debug!(row, label = %label, "skipping row whose period label has no digits");
        return None;
    };
    let date_range = columns
        .date_range
        .and_then(|column| label_text(grid.get(row, column)));
    Some((period, date_range))
}

fn positive_number(grid: &CellGrid, row: usize, column: usize) -> Option<f64> {
    try_parse_number(grid.get(row, column)).filter(|value| *value > 0.0)
}
