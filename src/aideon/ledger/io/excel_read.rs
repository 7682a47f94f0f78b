use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, instrument};

use crate::aideon::ledger::error::{LedgerError, Result};
use crate::aideon::ledger::model::{Cell, CellGrid};

/// Reads the first worksheet of a workbook, whatever it is called, into a
/// [`CellGrid`].
///
/// Cells keep their absolute A1-anchored coordinates: leading blank rows and
/// columns become [`Cell::Empty`] so configured row indices line up with what
/// a spreadsheet user sees.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn read_first_sheet(path: &Path) -> Result<CellGrid> {
    if !path.exists() {
        return Err(LedgerError::MissingInput(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook.sheet_names().first().cloned().unwrap_or_default();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LedgerError::Extraction {
            path: Some(path.to_path_buf()),
            row: None,
            detail: "workbook contains no worksheets".to_string(),
        })??;

    let grid = range_to_grid(&range);
    debug!(
        sheet = %sheet_name,
        rows = grid.height(),
        columns = grid.width(),
        "read worksheet"
    );
    Ok(grid)
}

fn range_to_grid(range: &Range<DataType>) -> CellGrid {
    let Some((row_offset, column_offset)) = range.start() else {
        return CellGrid::default();
    };
    let row_offset = row_offset as usize;
    let column_offset = column_offset as usize;

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for source_row in range.rows() {
        let mut cells = vec![Cell::Empty; column_offset];
        cells.extend(source_row.iter().map(to_cell));
        while cells.last().is_some_and(Cell::is_empty) {
            cells.pop();
        }
        rows.push(cells);
    }
    CellGrid::new(rows)
}

fn to_cell(value: &DataType) -> Cell {
    match value {
        DataType::Empty => Cell::Empty,
        DataType::Float(value) => Cell::Number(*value),
        DataType::Int(value) => Cell::Number(*value as f64),
        DataType::Bool(value) => Cell::Bool(*value),
        DataType::String(value) if value.trim().is_empty() => Cell::Empty,
        DataType::String(value) => Cell::Text(value.clone()),
        DataType::DateTime(serial) => value
            .as_datetime()
            .map(|datetime| Cell::Text(format_datetime(datetime)))
            .unwrap_or(Cell::Number(*serial)),
        DataType::Error(error) => Cell::Error(error.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

/// Date-formatted cells are labels, not amounts: render them the way the
/// sheet displays them, dropping a midnight time component.
fn format_datetime(datetime: NaiveDateTime) -> String {
    if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
