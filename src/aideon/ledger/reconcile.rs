use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aideon::ledger::error::{LedgerError, Result};
use crate::aideon::ledger::model::{CostRow, FactRecord, FactTable, Period, RevenueRow};

/// How strictly cost rows are checked against the revenue side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Reject cost rows without a matching revenue row and duplicate cost
    /// rows instead of discarding them.
    #[serde(default)]
    pub strict: bool,
}

/// Left-joins revenue rows with cost rows on `(period, branch)`.
///
/// Revenue is authoritative: every revenue row yields exactly one fact, with
/// cost defaulting to zero when no cost row matches. Duplicate revenue keys
/// always fail because the resulting table could not be keyed uniquely.
#[instrument(level = "debug", skip_all, fields(revenue_rows = revenue.len(), cost_rows = costs.len()))]
pub fn reconcile(
    revenue: Vec<RevenueRow>,
    costs: &[CostRow],
    options: ReconcileOptions,
) -> Result<FactTable> {
    let mut cost_by_key: HashMap<(Period, &str), f64> = HashMap::with_capacity(costs.len());
    for row in costs {
        match cost_by_key.entry((row.period, row.branch.as_str())) {
            Entry::Vacant(slot) => {
                slot.insert(row.cost);
            }
            Entry::Occupied(_) if options.strict => {
                return Err(LedgerError::Reconciliation {
                    period: row.period,
                    branch: row.branch.clone(),
                    detail: "cost table lists this period more than once".to_string(),
                });
            }
            Entry::Occupied(_) => {
                warn!(period = row.period, branch = %row.branch, "duplicate cost row ignored");
            }
        }
    }

    let mut seen: HashSet<(Period, String)> = HashSet::with_capacity(revenue.len());
    let mut records = Vec::with_capacity(revenue.len());
    let mut matched = 0usize;
    for row in revenue {
        if !seen.insert((row.period, row.branch.clone())) {
            return Err(LedgerError::Reconciliation {
                period: row.period,
                branch: row.branch,
                detail: "revenue workbook yields this period more than once".to_string(),
            });
        }
        let cost = match cost_by_key.get(&(row.period, row.branch.as_str())) {
            Some(cost) => {
                matched += 1;
                *cost
            }
            None => 0.0,
        };
        records.push(FactRecord::new(row, cost));
    }

    let unmatched: Vec<&CostRow> = costs
        .iter()
        .filter(|row| !seen.contains(&(row.period, row.branch.clone())))
        .collect();
    if options.strict {
        if let Some(orphan) = unmatched.iter().find(|row| row.cost != 0.0) {
            return Err(LedgerError::Reconciliation {
                period: orphan.period,
                branch: orphan.branch.clone(),
                detail: "cost recorded without matching revenue".to_string(),
            });
        }
    }
    debug!(
        facts = records.len(),
        matched_costs = matched,
        discarded_costs = unmatched.len(),
        "revenue and costs reconciled"
    );

    Ok(FactTable::from_records(records))
}
