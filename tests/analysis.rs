mod common;

use aideon_ledger::LedgerError;
use aideon_ledger::aggregate::{
    branch_totals, margin_dispersion_by_branch, period_totals, population_std_dev,
    revenue_volatility_pct,
};
use aideon_ledger::insight::{
    self, Category, InsightKind, InsightThresholds, RecommendationKind, Severity,
    recoverable_profit,
};
use aideon_ledger::model::{CostRow, FactRecord, FactTable, Kpis, RevenueRow, Selection};
use aideon_ledger::pipeline::facts_from_grids;
use aideon_ledger::reconcile::{ReconcileOptions, reconcile};
use aideon_ledger::report::{self, BranchStatus, Outlook, TrendDirection};

use common::*;

fn revenue(period: u32, branch: &str, revenue: f64, hours: f64) -> RevenueRow {
    RevenueRow {
        period,
        branch: branch.to_string(),
        revenue,
        hours,
        date_range: None,
    }
}

fn cost(period: u32, branch: &str, cost: f64) -> CostRow {
    CostRow {
        period,
        branch: branch.to_string(),
        cost,
    }
}

fn facts(rows: &[(u32, &str, f64, f64)]) -> FactTable {
    let records = rows
        .iter()
        .map(|(period, branch, rev, cost)| FactRecord::new(revenue(*period, branch, *rev, 0.0), *cost))
        .collect();
    FactTable::from_records(records)
}

fn scenario_facts() -> FactTable {
    facts_from_grids(
        &grid(scenario_revenue_rows()),
        &grid(scenario_cost_rows()),
        &scenario_data_config(),
        ReconcileOptions::default(),
    )
    .expect("scenario fact table")
}

#[test]
fn end_to_end_scenario_produces_expected_facts_and_shares() {
    let facts = scenario_facts();

    assert_eq!(facts.len(), 3);
    assert!(facts.get(1, "South").is_none(), "n/a revenue is dropped");

    let north_2 = facts.get(2, "North").expect("period 2 north");
    assert_close(north_2.gross_profit, 500.0);
    assert_close(north_2.margin_pct, 41.7);
    assert_close(north_2.rev_per_hour, 20.0);

    let branches = branch_totals(&facts);
    let north = branches
        .iter()
        .find(|branch| branch.branch == "North")
        .expect("north aggregate");
    assert_close(north.revenue_total, 2200.0);
    assert!((north.revenue_share_pct - 73.3).abs() < 0.05);
    assert_eq!(branches[0].branch, "North", "ordered by revenue");
}

#[test]
fn derived_metrics_are_safe_for_zero_revenue_and_hours() {
    let record = FactRecord::new(revenue(1, "North", 0.0, 0.0), 120.0);
    assert_eq!(record.margin_pct, 0.0);
    assert_eq!(record.rev_per_hour, 0.0);
    assert_eq!(record.gross_profit, -120.0);

    let record = FactRecord::new(revenue(1, "North", 300.0, 7.0), 100.0);
    assert_close(record.margin_pct, 66.7);
    assert_close(record.rev_per_hour, 42.86);
}

#[test]
fn left_join_keeps_every_revenue_row_exactly_once() {
    let rows = vec![
        revenue(2, "South", 800.0, 40.0),
        revenue(1, "North", 1000.0, 50.0),
        revenue(2, "North", 1200.0, 60.0),
    ];
    let costs = vec![
        cost(1, "North", 600.0),
        cost(2, "North", 700.0),
        cost(3, "East", 999.0),
    ];

    let table = reconcile(rows, &costs, ReconcileOptions::default()).expect("reconciled");

    let keys: Vec<(u32, &str)> = table.iter().map(FactRecord::key).collect();
    assert_eq!(keys, vec![(1, "North"), (2, "North"), (2, "South")]);
    assert_eq!(table.get(2, "South").expect("south").cost, 0.0);
    assert_eq!(table.get(2, "North").expect("north").cost, 700.0);
}

#[test]
fn strict_reconciliation_rejects_orphan_costs() {
    let rows = vec![revenue(1, "North", 1000.0, 0.0)];
    let costs = vec![cost(1, "North", 600.0), cost(1, "South", 0.0), cost(4, "North", 50.0)];

    let lenient = reconcile(rows.clone(), &costs, ReconcileOptions::default());
    assert!(lenient.is_ok());

    let error = reconcile(rows, &costs, ReconcileOptions { strict: true })
        .expect_err("orphan cost rejected");
    match error {
        LedgerError::Reconciliation { period, branch, .. } => {
            assert_eq!(period, 4);
            assert_eq!(branch, "North");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_revenue_keys_fail_reconciliation() {
    let rows = vec![revenue(1, "North", 10.0, 0.0), revenue(1, "North", 20.0, 0.0)];
    let error = reconcile(rows, &[], ReconcileOptions::default()).expect_err("duplicate key");
    assert!(matches!(error, LedgerError::Reconciliation { period: 1, .. }));
}

#[test]
fn duplicate_cost_rows_keep_the_first_value_unless_strict() {
    let rows = vec![revenue(1, "North", 100.0, 0.0)];
    let costs = vec![cost(1, "North", 30.0), cost(1, "North", 90.0)];

    let table = reconcile(rows.clone(), &costs, ReconcileOptions::default()).expect("lenient");
    assert_eq!(table.get(1, "North").expect("north").cost, 30.0);

    assert!(reconcile(rows, &costs, ReconcileOptions { strict: true }).is_err());
}

#[test]
fn branch_totals_conserve_revenue_cost_and_profit() {
    let table = facts(&[
        (1, "A", 1000.0, 700.0),
        (1, "B", 400.5, 100.25),
        (2, "A", 1100.0, 800.0),
        (2, "C", 50.0, 80.0),
        (3, "B", 333.3, 0.0),
    ]);
    let branches = branch_totals(&table);

    let sum = |pick: fn(&FactRecord) -> f64| table.iter().map(pick).sum::<f64>();
    assert_close(
        branches.iter().map(|branch| branch.revenue_total).sum(),
        sum(|record| record.revenue),
    );
    assert_close(
        branches.iter().map(|branch| branch.cost_total).sum(),
        sum(|record| record.cost),
    );
    assert_close(
        branches.iter().map(|branch| branch.profit_total).sum(),
        sum(|record| record.gross_profit),
    );
    assert_close(branches.iter().map(|branch| branch.revenue_share_pct).sum(), 100.0);
}

#[test]
fn branch_mean_margin_is_unweighted_and_distinct_from_margin_on_totals() {
    let table = facts(&[(1, "A", 1000.0, 500.0), (2, "A", 100.0, 90.0)]);
    let branch = &branch_totals(&table)[0];

    assert_close(branch.mean_margin, 30.0);
    assert_close(branch.margin_on_totals_pct, 46.4);
    assert_eq!(branch.period_count, 2);
}

#[test]
fn branch_revenue_ties_break_on_name() {
    let table = facts(&[(1, "Zeta", 500.0, 0.0), (1, "Alpha", 500.0, 0.0), (1, "Mid", 900.0, 0.0)]);
    let order: Vec<String> = branch_totals(&table)
        .into_iter()
        .map(|branch| branch.branch)
        .collect();
    assert_eq!(order, vec!["Mid", "Alpha", "Zeta"]);
}

#[test]
fn period_growth_is_undefined_at_the_boundary() {
    let table = facts(&[
        (1, "A", 1000.0, 400.0),
        (1, "B", 1000.0, 600.0),
        (2, "A", 2500.0, 1000.0),
        (4, "A", 3000.0, 0.0),
    ]);
    let periods = period_totals(&table);

    assert_eq!(periods.iter().map(|period| period.period).collect::<Vec<_>>(), vec![1, 2, 4]);
    assert_eq!(periods[0].growth_pct, None);
    assert_close(periods[1].growth_pct.expect("growth"), 25.0);
    assert_close(periods[2].growth_pct.expect("growth"), 20.0);
    assert_close(periods[0].margin_pct, 50.0);
    assert_close(periods[0].profit_total, 1000.0);
}

#[test]
fn growth_after_a_zero_revenue_period_is_undefined() {
    let table = FactTable::from_records(vec![
        FactRecord::new(revenue(1, "A", 0.0, 0.0), 0.0),
        FactRecord::new(revenue(2, "A", 500.0, 0.0), 100.0),
    ]);
    let periods = period_totals(&table);

    assert_eq!(periods[0].margin_pct, 0.0);
    assert_eq!(periods[1].growth_pct, None);
}

#[test]
fn dispersion_helpers_use_population_statistics() {
    assert_close(population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    assert_eq!(population_std_dev(&[42.0]), 0.0);
    assert_eq!(population_std_dev(&[]), 0.0);

    let table = facts(&[(1, "A", 100.0, 90.0), (2, "A", 100.0, 70.0), (1, "B", 100.0, 50.0)]);
    let dispersion = margin_dispersion_by_branch(&table);
    assert_eq!(dispersion[0].branch, "A");
    assert_close(dispersion[0].margin_std, 10.0);
    assert_close(dispersion[1].margin_std, 0.0);

    let periods = period_totals(&facts(&[(1, "A", 100.0, 0.0), (2, "A", 300.0, 0.0)]));
    assert_close(revenue_volatility_pct(&periods), 50.0);
    assert_eq!(revenue_volatility_pct(&[]), 0.0);
}

#[test]
fn insight_rules_flag_pressure_concentration_and_volatility() {
    let table = facts(&[
        (1, "Big", 5000.0, 3500.0),
        (2, "Big", 5000.0, 2500.0),
        (1, "Lean", 1000.0, 900.0),
        (2, "Lean", 1000.0, 900.0),
        (1, "Rich", 1000.0, 600.0),
        (2, "Rich", 1000.0, 600.0),
    ]);
    let branches = branch_totals(&table);
    let insights = insight::analyze(&branches, &table, &InsightThresholds::default());

    let kinds: Vec<InsightKind> = insights.risks.iter().map(|insight| insight.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InsightKind::MarginPressure,
            InsightKind::Concentration,
            InsightKind::Volatility,
        ]
    );
    assert!(insights.risks.iter().all(|insight| insight.category == Category::Risk));

    let pressure = &insights.risks[0];
    assert_eq!(pressure.severity, Severity::High);
    assert_eq!(pressure.branches, vec!["Lean"]);

    let concentration = &insights.risks[1];
    assert_eq!(concentration.branches, vec!["Big"]);
    assert!((concentration.value.expect("share") - 71.43).abs() < 0.01);

    assert_eq!(insights.risks[2].branches, vec!["Big"]);
}

#[test]
fn quiet_data_yields_a_single_low_risk_insight() {
    let table = facts(&[
        (1, "A", 1000.0, 700.0),
        (1, "B", 1000.0, 700.0),
        (1, "C", 1000.0, 700.0),
    ]);
    let branches = branch_totals(&table);
    let insights = insight::analyze(&branches, &table, &InsightThresholds::default());

    assert_eq!(insights.risks.len(), 1);
    assert_eq!(insights.risks[0].kind, InsightKind::LowRiskProfile);
    assert_eq!(insights.risks[0].severity, Severity::Info);
}

#[test]
fn opportunities_size_the_recoverable_profit() {
    let table = facts(&[
        (1, "High", 1000.0, 600.0),
        (1, "Mid", 1000.0, 750.0),
        (1, "Low", 2000.0, 1800.0),
    ]);
    let branches = branch_totals(&table);

    // Margins 40, 25, 10: average 25, so only Low is below it.
    assert_close(recoverable_profit(&branches), 300.0);

    let insights = insight::analyze(&branches, &table, &InsightThresholds::default());
    let kinds: Vec<InsightKind> = insights
        .opportunities
        .iter()
        .map(|insight| insight.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            InsightKind::BestPractice,
            InsightKind::MarginEnhancement,
            InsightKind::ScaleOptimization,
        ]
    );
    assert_eq!(insights.opportunities[0].branches, vec!["High"]);
    let enhancement = &insights.opportunities[1];
    assert_eq!(enhancement.branches, vec!["Low"]);
    assert!(enhancement.text.contains("£300"), "text was {}", enhancement.text);
    assert_close(insights.opportunities[2].value.expect("revenue base"), 4000.0);

    assert_eq!(insights.recommendations.len(), 1);
    let initiative = &insights.recommendations[0];
    assert_eq!(initiative.kind, RecommendationKind::MarginImprovement);
    assert_eq!(initiative.branches, vec!["Low"]);
    assert_close(initiative.projected_impact, 50.0);
    assert!(initiative.text.contains("£50"), "text was {}", initiative.text);
}

#[test]
fn uniform_margins_produce_no_recommendation() {
    let table = facts(&[(1, "A", 1000.0, 700.0), (1, "B", 2000.0, 1400.0)]);
    let insights = insight::analyze(&branch_totals(&table), &table, &InsightThresholds::default());
    assert!(insights.recommendations.is_empty());
}

#[test]
fn thresholds_are_configurable() {
    let table = facts(&[(1, "A", 1000.0, 850.0), (1, "B", 1000.0, 850.0)]);
    let branches = branch_totals(&table);
    let relaxed = InsightThresholds {
        margin_pressure_pct: 10.0,
        concentration_share_pct: 60.0,
        ..InsightThresholds::default()
    };

    let insights = insight::analyze(&branches, &table, &relaxed);
    assert_eq!(insights.risks[0].kind, InsightKind::LowRiskProfile);
}

#[test]
fn report_summarises_outlook_rankings_and_trend() {
    let table = facts(&[
        (1, "A", 1000.0, 700.0),
        (1, "B", 500.0, 450.0),
        (2, "A", 1200.0, 800.0),
        (2, "B", 600.0, 420.0),
    ]);
    let analysis = report::analyze(&table, &InsightThresholds::default());

    assert_close(analysis.kpis.revenue, 3300.0);
    assert_close(analysis.summary.total_profit, 930.0);
    assert_close(analysis.summary.latest_growth_pct.expect("growth"), 20.0);
    assert_eq!(analysis.summary.top_branch.as_deref(), Some("A"));
    assert_eq!(analysis.summary.bottom_branch.as_deref(), Some("B"));
    assert_eq!(analysis.summary.outlook, Outlook::Strong);
    assert_eq!(analysis.summary.period_count, 2);

    assert_eq!(analysis.rankings[0].rank, 1);
    assert_eq!(analysis.rankings[0].status, BranchStatus::Excellent);
    assert_eq!(analysis.rankings[1].status, BranchStatus::Good);

    assert_eq!(analysis.trend.direction, TrendDirection::Increasing);
    assert_close(analysis.trend.first_to_last_pct.expect("change"), 20.0);
    assert_close(analysis.ratios.average_revenue_per_period, 1650.0);
    assert_close(analysis.ratios.cost_to_revenue_pct, 2370.0 / 3300.0 * 100.0);
}

#[test]
fn rankings_carry_each_branch_revenue_trend() {
    let table = facts(&[
        (1, "Rising", 1000.0, 600.0),
        (1, "Falling", 900.0, 600.0),
        (1, "Steady", 400.0, 300.0),
        (2, "Rising", 1100.0, 600.0),
        (2, "Steady", 400.0, 300.0),
        (3, "Falling", 700.0, 500.0),
        (3, "Rising", 1050.0, 600.0),
        (3, "Single", 50.0, 10.0),
    ]);
    let analysis = report::analyze(&table, &InsightThresholds::default());

    let trends: Vec<(&str, TrendDirection)> = analysis
        .rankings
        .iter()
        .map(|ranking| (ranking.branch.as_str(), ranking.trend))
        .collect();
    assert_eq!(
        trends,
        vec![
            ("Rising", TrendDirection::Increasing),
            ("Falling", TrendDirection::Decreasing),
            ("Steady", TrendDirection::Flat),
            ("Single", TrendDirection::Flat),
        ]
    );
    assert_eq!(report::branch_trend(&table, "Unknown"), TrendDirection::Flat);
}

#[test]
fn bottom_branch_ties_resolve_to_the_first_name() {
    let table = facts(&[
        (1, "Alpha", 500.0, 300.0),
        (1, "Zulu", 500.0, 300.0),
        (1, "Mid", 800.0, 400.0),
    ]);
    let analysis = report::analyze(&table, &InsightThresholds::default());
    assert_eq!(analysis.summary.top_branch.as_deref(), Some("Mid"));
    assert_eq!(analysis.summary.bottom_branch.as_deref(), Some("Alpha"));
}

#[test]
fn outlook_classification_follows_margin_and_growth() {
    assert_eq!(Outlook::classify(30.0, Some(5.0)), Outlook::Strong);
    assert_eq!(Outlook::classify(30.0, None), Outlook::Solid);
    assert_eq!(Outlook::classify(10.0, Some(1.0)), Outlook::Solid);
    assert_eq!(Outlook::classify(10.0, Some(-4.0)), Outlook::NeedsReview);
}

#[test]
fn selection_filters_periods_and_branches() {
    let table = scenario_facts();
    assert_eq!(table.periods(), vec![1, 2]);
    assert_eq!(table.branches(), vec!["North", "South"]);
    assert_eq!(table.latest_periods(1), vec![2]);
    assert_eq!(table.latest_periods(10), vec![1, 2]);

    let selection = Selection {
        periods: Some(vec![2]),
        branches: Some(vec!["North".to_string()]),
    };
    let selected = table.select(&selection);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected.records()[0].revenue, 1200.0);

    let kpis = Kpis::from_facts(&table.select(&Selection::all()));
    assert_close(kpis.revenue, 3000.0);
    assert_close(kpis.hours, 150.0);
    assert_close(kpis.cost, 1800.0);
}
