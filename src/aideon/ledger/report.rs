//! Assembles the structured report handed to rendering collaborators.

use serde::{Deserialize, Serialize};

use crate::aideon::ledger::aggregate::{
    self, BranchAggregate, PeriodAggregate, population_std_dev, revenue_volatility_pct,
};
use crate::aideon::ledger::insight::{self, InsightThresholds, Insights};
use crate::aideon::ledger::model::{Branch, FactTable, Kpis, round_to};

/// Overall-outlook classification of the executive summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outlook {
    /// Margin above 25% with growth above 3%.
    Strong,
    /// Margin above 20% or any positive growth.
    Solid,
    NeedsReview,
}

impl Outlook {
    pub fn classify(overall_margin_pct: f64, growth_pct: Option<f64>) -> Self {
        let growth = growth_pct.unwrap_or(0.0);
        if overall_margin_pct > 25.0 && growth > 3.0 {
            Outlook::Strong
        } else if overall_margin_pct > 20.0 || growth > 0.0 {
            Outlook::Solid
        } else {
            Outlook::NeedsReview
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub total_hours: f64,
    /// Summed profit over summed revenue.
    pub overall_margin_pct: f64,
    /// Latest period's revenue against the one before it.
    pub latest_growth_pct: Option<f64>,
    pub top_branch: Option<Branch>,
    /// Lowest revenue total; ties go to the first name.
    pub bottom_branch: Option<Branch>,
    pub period_count: usize,
    pub branch_count: usize,
    pub outlook: Outlook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRatios {
    pub average_revenue_per_period: f64,
    /// Coefficient of variation of period revenue, in percent.
    pub revenue_volatility_pct: f64,
    /// Standard deviation of period margins; lower is better.
    pub margin_consistency: f64,
    pub cost_to_revenue_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Excellent,
    Good,
    Fair,
    Review,
}

impl BranchStatus {
    pub fn from_margin(margin_pct: f64) -> Self {
        if margin_pct >= 25.0 {
            BranchStatus::Excellent
        } else if margin_pct >= 20.0 {
            BranchStatus::Good
        } else if margin_pct >= 15.0 {
            BranchStatus::Fair
        } else {
            BranchStatus::Review
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRanking {
    pub rank: usize,
    pub branch: Branch,
    pub revenue: f64,
    pub margin_pct: f64,
    pub revenue_share_pct: f64,
    pub status: BranchStatus,
    /// Revenue direction from the branch's first to its last period.
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Revenue change from the first to the last period.
    pub first_to_last_pct: Option<f64>,
    pub direction: TrendDirection,
    /// Whether record-level margins sit within three points of each other
    /// on average.
    pub margins_consistent: bool,
}

/// Record-level margin dispersion, in points, below which branches are
/// considered operationally standardised.
const MARGIN_CONSISTENCY_PTS: f64 = 3.0;

/// Every derivation over one fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub kpis: Kpis,
    pub summary: ExecutiveSummary,
    pub ratios: KeyRatios,
    pub branches: Vec<BranchAggregate>,
    pub periods: Vec<PeriodAggregate>,
    pub rankings: Vec<BranchRanking>,
    pub trend: TrendSummary,
    pub insights: Insights,
}

/// Derives aggregates, rankings and insights from a fact table. Pure and
/// recomputed on every call.
pub fn analyze(facts: &FactTable, thresholds: &InsightThresholds) -> Analysis {
    let branches = aggregate::branch_totals(facts);
    let periods = aggregate::period_totals(facts);
    let kpis = Kpis::from_facts(facts);

    Analysis {
        summary: executive_summary(&kpis, &branches, &periods),
        ratios: key_ratios(&kpis, &periods),
        rankings: rankings(facts, &branches),
        trend: trend(facts, &periods),
        insights: insight::analyze(&branches, facts, thresholds),
        kpis,
        branches,
        periods,
    }
}

fn executive_summary(
    kpis: &Kpis,
    branches: &[BranchAggregate],
    periods: &[PeriodAggregate],
) -> ExecutiveSummary {
    let overall_margin_pct = ratio_pct(kpis.gross_profit, kpis.revenue);
    let latest_growth_pct = periods.last().and_then(|period| period.growth_pct);
    ExecutiveSummary {
        total_revenue: kpis.revenue,
        total_cost: kpis.cost,
        total_profit: kpis.gross_profit,
        total_hours: kpis.hours,
        overall_margin_pct,
        latest_growth_pct,
        top_branch: branches.first().map(|branch| branch.branch.clone()),
        bottom_branch: branches
            .iter()
            .min_by(|lhs, rhs| {
                lhs.revenue_total
                    .total_cmp(&rhs.revenue_total)
                    .then_with(|| lhs.branch.cmp(&rhs.branch))
            })
            .map(|branch| branch.branch.clone()),
        period_count: periods.len(),
        branch_count: branches.len(),
        outlook: Outlook::classify(overall_margin_pct, latest_growth_pct),
    }
}

fn key_ratios(kpis: &Kpis, periods: &[PeriodAggregate]) -> KeyRatios {
    let revenues: Vec<f64> = periods.iter().map(|period| period.revenue_total).collect();
    let margins: Vec<f64> = periods.iter().map(|period| period.margin_pct).collect();
    KeyRatios {
        average_revenue_per_period: aggregate::mean(&revenues),
        revenue_volatility_pct: revenue_volatility_pct(periods),
        margin_consistency: population_std_dev(&margins),
        cost_to_revenue_pct: ratio_pct(kpis.cost, kpis.revenue),
    }
}

fn rankings(facts: &FactTable, branches: &[BranchAggregate]) -> Vec<BranchRanking> {
    branches
        .iter()
        .enumerate()
        .map(|(index, branch)| BranchRanking {
            rank: index + 1,
            branch: branch.branch.clone(),
            revenue: branch.revenue_total,
            margin_pct: branch.margin_on_totals_pct,
            revenue_share_pct: round_to(branch.revenue_share_pct, 1),
            status: BranchStatus::from_margin(branch.margin_on_totals_pct),
            trend: branch_trend(facts, &branch.branch),
        })
        .collect()
}

/// Compares the branch's revenue in its first and last reported periods.
/// A single period is flat.
pub fn branch_trend(facts: &FactTable, branch: &str) -> TrendDirection {
    let mut revenues = facts
        .iter()
        .filter(|record| record.branch == branch)
        .map(|record| record.revenue);
    let Some(first) = revenues.next() else {
        return TrendDirection::Flat;
    };
    let last = revenues.last().unwrap_or(first);
    direction_of(last - first)
}

fn direction_of(change: f64) -> TrendDirection {
    if change > 0.0 {
        TrendDirection::Increasing
    } else if change < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Flat
    }
}

fn trend(facts: &FactTable, periods: &[PeriodAggregate]) -> TrendSummary {
    let first_to_last_pct = match (periods.first(), periods.last()) {
        (Some(first), Some(last)) if periods.len() > 1 && first.revenue_total != 0.0 => {
            Some((last.revenue_total - first.revenue_total) / first.revenue_total * 100.0)
        }
        _ => None,
    };
    let direction = first_to_last_pct.map_or(TrendDirection::Flat, direction_of);
    let margins: Vec<f64> = facts.iter().map(|record| record.margin_pct).collect();
    TrendSummary {
        first_to_last_pct,
        direction,
        margins_consistent: population_std_dev(&margins) < MARGIN_CONSISTENCY_PTS,
    }
}

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}
