//! Pure roll-ups of a [`FactTable`] by branch and by period, plus the
//! dispersion statistics the insight rules feed on.
//!
//! Branch margins are reported two ways on purpose. `mean_margin` is the
//! simple mean of the branch's per-period margins, while
//! `margin_on_totals_pct` (and the period-level `margin_pct`) divide summed
//! profit by summed revenue. Consumers rely on each separately.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aideon::ledger::model::{Branch, FactTable, Period, round_to};

/// Per-branch totals across every period present in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchAggregate {
    pub branch: Branch,
    pub revenue_total: f64,
    pub cost_total: f64,
    pub profit_total: f64,
    pub hours_total: f64,
    /// Arithmetic mean of the per-period margins, not revenue weighted.
    pub mean_margin: f64,
    /// Share of the grand revenue total, in percent.
    pub revenue_share_pct: f64,
    /// Summed profit over summed revenue, rounded to one decimal.
    pub margin_on_totals_pct: f64,
    pub period_count: usize,
}

/// Per-period totals across every branch present in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub period: Period,
    pub revenue_total: f64,
    pub cost_total: f64,
    pub profit_total: f64,
    pub hours_total: f64,
    /// Summed profit over summed revenue, rounded to one decimal.
    pub margin_pct: f64,
    /// Revenue change against the preceding period. `None` for the first
    /// period and whenever the predecessor's revenue is zero.
    pub growth_pct: Option<f64>,
}

#[derive(Default)]
struct Totals {
    revenue: f64,
    cost: f64,
    profit: f64,
    hours: f64,
    margins: Vec<f64>,
}

impl Totals {
    fn margin_on_totals(&self) -> f64 {
        if self.revenue == 0.0 {
            0.0
        } else {
            round_to(self.profit / self.revenue * 100.0, 1)
        }
    }
}

/// Groups the facts by branch, ordered by revenue (descending) and then by
/// branch name.
pub fn branch_totals(facts: &FactTable) -> Vec<BranchAggregate> {
    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for record in facts {
        let totals = groups.entry(record.branch.as_str()).or_default();
        totals.revenue += record.revenue;
        totals.cost += record.cost;
        totals.profit += record.gross_profit;
        totals.hours += record.hours;
        totals.margins.push(record.margin_pct);
    }

    let grand_revenue: f64 = groups.values().map(|totals| totals.revenue).sum();
    let mut aggregates: Vec<BranchAggregate> = groups
        .into_iter()
        .map(|(branch, totals)| BranchAggregate {
            branch: branch.to_string(),
            revenue_total: totals.revenue,
            cost_total: totals.cost,
            profit_total: totals.profit,
            hours_total: totals.hours,
            mean_margin: mean(&totals.margins),
            revenue_share_pct: if grand_revenue == 0.0 {
                0.0
            } else {
                totals.revenue / grand_revenue * 100.0
            },
            margin_on_totals_pct: totals.margin_on_totals(),
            period_count: totals.margins.len(),
        })
        .collect();

    aggregates.sort_by(|lhs, rhs| {
        rhs.revenue_total
            .total_cmp(&lhs.revenue_total)
            .then_with(|| lhs.branch.cmp(&rhs.branch))
    });
    aggregates
}

/// Groups the facts by period in ascending order and computes
/// period-over-period revenue growth.
pub fn period_totals(facts: &FactTable) -> Vec<PeriodAggregate> {
    let mut groups: BTreeMap<Period, Totals> = BTreeMap::new();
    for record in facts {
        let totals = groups.entry(record.period).or_default();
        totals.revenue += record.revenue;
        totals.cost += record.cost;
        totals.profit += record.gross_profit;
        totals.hours += record.hours;
    }

    let mut previous_revenue: Option<f64> = None;
    groups
        .into_iter()
        .map(|(period, totals)| {
            let growth_pct = previous_revenue
                .filter(|previous| *previous != 0.0)
                .map(|previous| (totals.revenue - previous) / previous * 100.0);
            previous_revenue = Some(totals.revenue);
            PeriodAggregate {
                period,
                revenue_total: totals.revenue,
                cost_total: totals.cost,
                profit_total: totals.profit,
                hours_total: totals.hours,
                margin_pct: totals.margin_on_totals(),
                growth_pct,
            }
        })
        .collect()
}

/// Margin dispersion of one branch across the periods it reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginDispersion {
    pub branch: Branch,
    pub margin_std: f64,
}

/// Population standard deviation of each branch's margin across periods,
/// in branch name order.
pub fn margin_dispersion_by_branch(facts: &FactTable) -> Vec<MarginDispersion> {
    let mut margins: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in facts {
        margins
            .entry(record.branch.as_str())
            .or_default()
            .push(record.margin_pct);
    }
    margins
        .into_iter()
        .map(|(branch, values)| MarginDispersion {
            branch: branch.to_string(),
            margin_std: population_std_dev(&values),
        })
        .collect()
}

/// Coefficient of variation of period revenue totals, in percent. Zero when
/// there are no periods or mean revenue is zero.
pub fn revenue_volatility_pct(periods: &[PeriodAggregate]) -> f64 {
    let revenues: Vec<f64> = periods.iter().map(|period| period.revenue_total).collect();
    let average = mean(&revenues);
    if average == 0.0 {
        return 0.0;
    }
    population_std_dev(&revenues) / average * 100.0
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; zero for fewer than two values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let average = mean(values);
    let variance = values
        .iter()
        .map(|value| (value - average).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}
