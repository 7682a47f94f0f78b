use tracing::{debug, instrument, warn};

use crate::aideon::ledger::error::{LedgerError, Result};
use crate::aideon::ledger::model::grid::{label_text, parse_int_prefix, try_parse_number};
use crate::aideon::ledger::model::{Branch, CellGrid, CostRow};

/// Row holding the costs table header; the row above it is a description.
pub const DEFAULT_HEADER_ROW: usize = 1;

/// Reshapes the wide costs table (one row per period, one column per branch)
/// into long-form cost rows.
///
/// The header must read `[Period] + branches + [Total]`, the trailing total
/// column being optional. Rows whose period cell is blank or holds no digits
/// are dropped; non-numeric cost cells count as zero.
#[instrument(level = "debug", skip(grid, branches), fields(rows = grid.height()))]
pub fn normalize_costs(grid: &CellGrid, header_row: usize, branches: &[Branch]) -> Result<Vec<CostRow>> {
    let expected = branches.len() + 2;
    let header = grid.row(header_row).ok_or_else(|| LedgerError::SchemaMismatch {
        path: None,
        expected,
        found: 0,
        detail: format!("header row {header_row} is missing"),
    })?;

    let width = header
        .iter()
        .rposition(|cell| !cell.is_empty())
        .map_or(0, |last| last + 1);
    if width != expected && width != expected - 1 {
        return Err(LedgerError::SchemaMismatch {
            path: None,
            expected,
            found: width,
            detail: format!(
                "header row {header_row} must hold Period, {} branch column(s) and an optional Total",
                branches.len()
            ),
        });
    }

    for (index, branch) in branches.iter().enumerate() {
        let label = header.get(index + 1).map(|cell| cell.as_text()).unwrap_or_default();
        if !label.trim().eq_ignore_ascii_case(branch) {
            warn!(
                column = index + 1,
                header = %label.trim(),
                branch = %branch,
                "cost column header differs from configured branch; using position"
            );
        }
    }

    let mut costs = Vec::new();
    for row in (header_row + 1)..grid.height() {
        let Some(label) = label_text(grid.get(row, 0)) else {
            continue;
        };
        let Some(period) = parse_int_prefix(&label) else {
            debug!(row, label = %label, "dropping cost row without a numeric period");
            continue;
        };
        for (index, branch) in branches.iter().enumerate() {
            let cost = match try_parse_number(grid.get(row, index + 1)) {
                Some(value) if value < 0.0 => {
                    warn!(row, branch = %branch, value, "negative cost treated as zero");
                    0.0
                }
                Some(value) => value,
                None => 0.0,
            };
            costs.push(CostRow {
                period,
                branch: branch.clone(),
                cost,
            });
        }
    }

    debug!(cost_rows = costs.len(), "cost table normalized");
    Ok(costs)
}
