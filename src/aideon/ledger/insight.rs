//! Threshold rules that turn aggregates into risk and opportunity findings.

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aideon::ledger::aggregate::{BranchAggregate, margin_dispersion_by_branch, mean};
use crate::aideon::ledger::model::{Branch, FactTable};

/// Branch mean margin, in percent, below which margin pressure is flagged.
pub const MARGIN_PRESSURE_PCT: f64 = 20.0;

/// Revenue share, in percent, above which a single branch is a
/// concentration risk.
pub const CONCENTRATION_SHARE_PCT: f64 = 40.0;

/// Standard deviation of a branch's margin across periods, in percentage
/// points, above which its margin is considered volatile.
pub const VOLATILITY_STD_PCT: f64 = 5.0;

/// Branch mean margin, in percent, above which the branch is a best-practice
/// candidate.
pub const BEST_PRACTICE_PCT: f64 = 25.0;

/// Margin gain, in percentage points, an improvement programme is assumed
/// to deliver when sizing its projected impact.
pub const MARGIN_IMPROVEMENT_TARGET_PTS: f64 = 2.5;

/// Tunable thresholds for the insight rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    pub margin_pressure_pct: f64,
    pub concentration_share_pct: f64,
    pub volatility_std_pct: f64,
    pub best_practice_pct: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            margin_pressure_pct: MARGIN_PRESSURE_PCT,
            concentration_share_pct: CONCENTRATION_SHARE_PCT,
            volatility_std_pct: VOLATILITY_STD_PCT,
            best_practice_pct: BEST_PRACTICE_PCT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Risk,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

/// Which rule produced an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MarginPressure,
    Concentration,
    Volatility,
    LowRiskProfile,
    BestPractice,
    MarginEnhancement,
    ScaleOptimization,
}

/// A single finding. Regenerated on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: Category,
    pub severity: Severity,
    pub kind: InsightKind,
    pub text: String,
    /// Branches the finding names, if any.
    pub branches: Vec<Branch>,
    /// Headline figure behind the finding (share, potential profit, ...).
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    MarginImprovement,
}

/// An action proposed for the coming quarter, with the profit it is
/// projected to add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub text: String,
    pub branches: Vec<Branch>,
    pub projected_impact: f64,
}

/// Risks, opportunities and recommendations for one analysis run.
///
/// `risks` is never empty: when no rule fires it holds a single
/// informational low-risk-profile finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub risks: Vec<Insight>,
    pub opportunities: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

/// Evaluates every rule against the branch aggregates. The fact table is
/// needed for the per-period margin volatility rule.
pub fn analyze(
    branches: &[BranchAggregate],
    facts: &FactTable,
    thresholds: &InsightThresholds,
) -> Insights {
    let mut risks = Vec::new();
    risks.extend(margin_pressure(branches, thresholds));
    risks.extend(concentration(branches, thresholds));
    risks.extend(volatility(facts, thresholds));
    if risks.is_empty() {
        risks.push(Insight {
            category: Category::Risk,
            severity: Severity::Info,
            kind: InsightKind::LowRiskProfile,
            text: "Low risk profile: current operations demonstrate stable performance across key risk metrics.".to_string(),
            branches: Vec::new(),
            value: None,
        });
    }

    let mut opportunities = Vec::new();
    opportunities.extend(best_practice(branches, thresholds));
    opportunities.extend(margin_enhancement(branches));
    opportunities.extend(scale_optimization(branches));

    let recommendations: Vec<Recommendation> = margin_improvement(branches).into_iter().collect();

    debug!(
        risks = risks.len(),
        opportunities = opportunities.len(),
        recommendations = recommendations.len(),
        "insight rules evaluated"
    );
    Insights {
        risks,
        opportunities,
        recommendations,
    }
}

fn margin_pressure(branches: &[BranchAggregate], thresholds: &InsightThresholds) -> Option<Insight> {
    let names = branch_names(branches, |branch| {
        branch.mean_margin < thresholds.margin_pressure_pct
    });
    if names.is_empty() {
        return None;
    }
    Some(Insight {
        category: Category::Risk,
        severity: Severity::High,
        kind: InsightKind::MarginPressure,
        text: format!(
            "Margin pressure: {} branch(es) operating below the {}% margin threshold - {}. Cost structure review recommended.",
            names.len(),
            thresholds.margin_pressure_pct,
            names.join(", ")
        ),
        value: Some(names.len() as f64),
        branches: names,
    })
}

fn concentration(branches: &[BranchAggregate], thresholds: &InsightThresholds) -> Option<Insight> {
    let top = branches
        .iter()
        .max_by(|lhs, rhs| lhs.revenue_share_pct.total_cmp(&rhs.revenue_share_pct))?;
    if top.revenue_share_pct <= thresholds.concentration_share_pct {
        return None;
    }
    Some(Insight {
        category: Category::Risk,
        severity: Severity::Medium,
        kind: InsightKind::Concentration,
        text: format!(
            "Revenue concentration: {} represents {:.1}% of total revenue, creating dependency risk.",
            top.branch, top.revenue_share_pct
        ),
        branches: vec![top.branch.clone()],
        value: Some(top.revenue_share_pct),
    })
}

fn volatility(facts: &FactTable, thresholds: &InsightThresholds) -> Option<Insight> {
    let names: Vec<Branch> = margin_dispersion_by_branch(facts)
        .into_iter()
        .filter(|dispersion| dispersion.margin_std > thresholds.volatility_std_pct)
        .map(|dispersion| dispersion.branch)
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(Insight {
        category: Category::Risk,
        severity: Severity::Medium,
        kind: InsightKind::Volatility,
        text: format!(
            "Margin volatility: {} branch(es) showing inconsistent margin performance - {}.",
            names.len(),
            names.join(", ")
        ),
        value: Some(names.len() as f64),
        branches: names,
    })
}

fn best_practice(branches: &[BranchAggregate], thresholds: &InsightThresholds) -> Option<Insight> {
    let names = branch_names(branches, |branch| {
        branch.mean_margin > thresholds.best_practice_pct
    });
    if names.is_empty() {
        return None;
    }
    Some(Insight {
        category: Category::Opportunity,
        severity: Severity::Medium,
        kind: InsightKind::BestPractice,
        text: format!(
            "Best practice replication: {} demonstrate(s) superior margin performance. Replicate their operating practices across lower-performing units.",
            names.join(", ")
        ),
        value: None,
        branches: names,
    })
}

/// Profit recoverable by lifting every below-average branch to the average
/// branch margin: `sum(revenue * (average - margin) / 100)`.
pub fn recoverable_profit(branches: &[BranchAggregate]) -> f64 {
    let margins: Vec<f64> = branches.iter().map(|branch| branch.mean_margin).collect();
    let average = mean(&margins);
    branches
        .iter()
        .filter(|branch| branch.mean_margin < average)
        .map(|branch| branch.revenue_total * (average - branch.mean_margin) / 100.0)
        .sum()
}

fn margin_enhancement(branches: &[BranchAggregate]) -> Option<Insight> {
    let margins: Vec<f64> = branches.iter().map(|branch| branch.mean_margin).collect();
    let average = mean(&margins);
    let names = branch_names(branches, |branch| branch.mean_margin < average);
    if names.is_empty() {
        return None;
    }
    let potential = recoverable_profit(branches);
    Some(Insight {
        category: Category::Opportunity,
        severity: Severity::High,
        kind: InsightKind::MarginEnhancement,
        text: format!(
            "Margin enhancement: bringing {} to the {:.1}% average margin could generate an additional {} in gross profit.",
            names.join(", "),
            average,
            format_money(potential)
        ),
        branches: names,
        value: Some(potential),
    })
}

/// Cost deep-dive for every branch below the average margin, sized as
/// their combined revenue times [`MARGIN_IMPROVEMENT_TARGET_PTS`].
fn margin_improvement(branches: &[BranchAggregate]) -> Option<Recommendation> {
    let margins: Vec<f64> = branches.iter().map(|branch| branch.mean_margin).collect();
    let average = mean(&margins);
    let below: Vec<&BranchAggregate> = branches
        .iter()
        .filter(|branch| branch.mean_margin < average)
        .collect();
    if below.is_empty() {
        return None;
    }
    let revenue: f64 = below.iter().map(|branch| branch.revenue_total).sum();
    let projected_impact = revenue * MARGIN_IMPROVEMENT_TARGET_PTS / 100.0;
    let names: Vec<Branch> = below.iter().map(|branch| branch.branch.clone()).collect();
    Some(Recommendation {
        kind: RecommendationKind::MarginImprovement,
        text: format!(
            "Margin improvement initiative: conduct a cost deep-dive for {}. Target a 2-3 point margin gain through operational efficiency; projected impact {} additional profit.",
            names.join(", "),
            format_money(projected_impact)
        ),
        branches: names,
        projected_impact,
    })
}

fn scale_optimization(branches: &[BranchAggregate]) -> Option<Insight> {
    let total: f64 = branches.iter().map(|branch| branch.revenue_total).sum();
    if total <= 0.0 {
        return None;
    }
    Some(Insight {
        category: Category::Opportunity,
        severity: Severity::Info,
        kind: InsightKind::ScaleOptimization,
        text: format!(
            "Scale optimization: the current revenue base of {} provides a foundation for procurement leverage and shared services.",
            format_money(total)
        ),
        branches: Vec::new(),
        value: Some(total),
    })
}

fn branch_names(
    branches: &[BranchAggregate],
    predicate: impl Fn(&BranchAggregate) -> bool,
) -> Vec<Branch> {
    branches
        .iter()
        .filter(|branch| predicate(branch))
        .map(|branch| branch.branch.clone())
        .collect()
}

/// Formats a currency amount rounded to whole pounds with thousands
/// separators, e.g. `£12,340`.
pub fn format_money(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}£{}", rounded.unsigned_abs().to_formatted_string(&Locale::en))
}
