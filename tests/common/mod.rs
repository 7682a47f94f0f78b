#![allow(dead_code)]

use std::path::Path;

use aideon_ledger::config::DataConfig;
use aideon_ledger::extract::{ColumnLayout, LayoutStrategy, RowRange};
use aideon_ledger::model::{Cell, CellGrid};
use rust_xlsxwriter::Workbook;

pub fn num(value: f64) -> Cell {
    Cell::Number(value)
}

pub fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

pub fn empty() -> Cell {
    Cell::Empty
}

pub fn branches(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Revenue sheet for the North/South scenario: a header row, two revenue
/// rows (1-2), a blank spacer and two hours rows (4-5).
pub fn scenario_revenue_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![text("Revenue"), text("Period"), text("Dates"), text("North"), text("South")],
        vec![empty(), text("Period 1"), text("Jan-Mar"), num(1000.0), text("n/a")],
        vec![empty(), num(2.0), text("Apr-Jun"), num(1200.0), num(800.0)],
        vec![text("Hours")],
        vec![empty(), text("Period 1"), empty(), num(50.0)],
        vec![empty(), num(2.0), empty(), num(60.0), num(40.0)],
    ]
}

/// Costs sheet for the North/South scenario: description row, header, data.
pub fn scenario_cost_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![text("Direct costs by branch")],
        vec![text("Period"), text("North"), text("South"), text("Total")],
        vec![text("Period 1"), num(600.0), empty(), num(600.0)],
        vec![text("P2"), num(700.0), num(500.0), num(1200.0)],
    ]
}

pub fn scenario_layout() -> LayoutStrategy {
    LayoutStrategy::FixedRange {
        revenue_rows: RowRange::new(1, 2),
        hours_rows: RowRange::new(4, 5),
    }
}

pub fn scenario_data_config() -> DataConfig {
    DataConfig {
        branches: branches(&["North", "South"]),
        revenue_file_pattern: "*Revenue*.xlsx".to_string(),
        costs_file_pattern: "*Costs*.xlsx".to_string(),
        search_paths: vec!["data".into()],
        revenue_layout: scenario_layout(),
        columns: ColumnLayout::default(),
        costs_header_row: 1,
    }
}

pub fn grid(rows: Vec<Vec<Cell>>) -> CellGrid {
    CellGrid::new(rows)
}

/// Writes the rows into the first sheet of a new workbook.
pub fn write_xlsx(path: &Path, sheet_name: &str, rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).expect("sheet named");
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (row, col) = (row_idx as u32, col_idx as u16);
            match cell {
                Cell::Number(value) => {
                    worksheet.write_number(row, col, *value).expect("number written");
                }
                Cell::Text(value) => {
                    worksheet.write_string(row, col, value).expect("string written");
                }
                Cell::Bool(value) => {
                    worksheet.write_boolean(row, col, *value).expect("bool written");
                }
                Cell::Empty | Cell::Error(_) => {}
            }
        }
    }
    workbook.save(path).expect("workbook saved");
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
