use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod grid;

pub use grid::{Cell, CellGrid};

/// Business unit identifier drawn from the configured branch list.
pub type Branch = String;

/// Integer reporting-period identifier. Ordering is chronological.
pub type Period = u32;

/// Revenue-side observation produced by the table extractor. Cost and the
/// derived metrics are filled in during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub period: Period,
    pub branch: Branch,
    pub revenue: f64,
    pub hours: f64,
    /// Human-readable date range printed next to the period, when present.
    pub date_range: Option<String>,
}

/// Long-form cost observation produced by the cost table normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub period: Period,
    pub branch: Branch,
    pub cost: f64,
}

/// One reconciled `(period, branch)` observation with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub period: Period,
    pub branch: Branch,
    pub revenue: f64,
    pub hours: f64,
    pub cost: f64,
    pub gross_profit: f64,
    pub margin_pct: f64,
    pub rev_per_hour: f64,
    pub date_range: Option<String>,
}

impl FactRecord {
    /// Builds a record and derives gross profit, margin and revenue per hour.
    pub fn new(row: RevenueRow, cost: f64) -> Self {
        let gross_profit = row.revenue - cost;
        let margin_pct = if row.revenue == 0.0 {
            0.0
        } else {
            round_to(gross_profit / row.revenue * 100.0, 1)
        };
        let rev_per_hour = if row.hours == 0.0 {
            0.0
        } else {
            round_to(row.revenue / row.hours, 2)
        };
        Self {
            period: row.period,
            branch: row.branch,
            revenue: row.revenue,
            hours: row.hours,
            cost,
            gross_profit,
            margin_pct,
            rev_per_hour,
            date_range: row.date_range,
        }
    }

    pub fn key(&self) -> (Period, &str) {
        (self.period, self.branch.as_str())
    }
}

/// Rounds half away from zero to the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ordered collection of fact records, sorted by `(period, branch)` with no
/// duplicate keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactTable {
    records: Vec<FactRecord>,
}

impl FactTable {
    /// Sorts the records into table order. Callers are responsible for key
    /// uniqueness; the reconciler enforces it.
    pub fn from_records(mut records: Vec<FactRecord>) -> Self {
        records.sort_by(|lhs, rhs| lhs.key().cmp(&rhs.key()));
        Self { records }
    }

    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FactRecord> {
        self.records.iter()
    }

    pub fn get(&self, period: Period, branch: &str) -> Option<&FactRecord> {
        self.records
            .binary_search_by(|record| record.key().cmp(&(period, branch)))
            .ok()
            .map(|index| &self.records[index])
    }

    /// Distinct periods in ascending order.
    pub fn periods(&self) -> Vec<Period> {
        let periods: BTreeSet<Period> = self.records.iter().map(|record| record.period).collect();
        periods.into_iter().collect()
    }

    /// Distinct branches in ascending order.
    pub fn branches(&self) -> Vec<Branch> {
        let branches: BTreeSet<&str> = self
            .records
            .iter()
            .map(|record| record.branch.as_str())
            .collect();
        branches.into_iter().map(str::to_string).collect()
    }

    /// The `count` most recent periods, oldest first.
    pub fn latest_periods(&self, count: usize) -> Vec<Period> {
        let periods = self.periods();
        let skip = periods.len().saturating_sub(count);
        periods.into_iter().skip(skip).collect()
    }

    /// Returns the sub-table matching the selection.
    pub fn select(&self, selection: &Selection) -> FactTable {
        let records = self
            .records
            .iter()
            .filter(|record| selection.matches(record))
            .cloned()
            .collect();
        FactTable { records }
    }
}

impl<'a> IntoIterator for &'a FactTable {
    type Item = &'a FactRecord;
    type IntoIter = std::slice::Iter<'a, FactRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Period/branch filter applied before analysis. `None` keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub periods: Option<Vec<Period>>,
    pub branches: Option<Vec<Branch>>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &FactRecord) -> bool {
        let period_ok = self
            .periods
            .as_ref()
            .is_none_or(|periods| periods.contains(&record.period));
        let branch_ok = self
            .branches
            .as_ref()
            .is_none_or(|branches| branches.iter().any(|branch| branch == &record.branch));
        period_ok && branch_ok
    }
}

/// Headline figures for a (possibly filtered) fact table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub revenue: f64,
    pub hours: f64,
    pub cost: f64,
    pub gross_profit: f64,
    /// Simple mean of the record-level margins.
    pub mean_margin_pct: f64,
}

impl Kpis {
    pub fn from_facts(facts: &FactTable) -> Self {
        let mut kpis = Kpis::default();
        for record in facts {
            kpis.revenue += record.revenue;
            kpis.hours += record.hours;
            kpis.cost += record.cost;
            kpis.gross_profit += record.gross_profit;
        }
        if !facts.is_empty() {
            kpis.mean_margin_pct =
                facts.iter().map(|record| record.margin_pct).sum::<f64>() / facts.len() as f64;
        }
        kpis
    }
}
