use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid digit regex"));

/// Labels that spreadsheet exports use to mean "no value".
const MISSING_SENTINELS: [&str; 7] = ["", "nan", "n/a", "na", "none", "null", "-"];

/// A single typed spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Formula error such as `#DIV/0!`.
    Error(String),
}

impl Cell {
    /// Renders the cell the way a spreadsheet user would read it. Whole
    /// numbers drop their fractional part so `7.0` reads as `7`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Cell::Number(value) => value.to_string(),
            Cell::Text(value) => value.clone(),
            Cell::Bool(value) => value.to_string(),
            Cell::Error(value) => value.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Coerces a cell to a finite number.
///
/// Numeric text is accepted after trimming whitespace, a leading currency
/// symbol and thousands separators. Anything else yields `None`.
pub fn try_parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(value) if value.is_finite() => Some(*value),
        Cell::Text(text) => {
            let trimmed = text.trim();
            let trimmed = trimmed
                .strip_prefix(['£', '$', '€'])
                .unwrap_or(trimmed)
                .trim();
            if trimmed.is_empty() {
                return None;
            }
            let cleaned = trimmed.replace(',', "");
            cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
        }
        _ => None,
    }
}

/// Extracts the first maximal run of ASCII digits from the cell's text form.
pub fn try_parse_int_prefix(cell: &Cell) -> Option<u32> {
    parse_int_prefix(&cell.as_text())
}

/// Text flavour of [`try_parse_int_prefix`].
pub fn parse_int_prefix(text: &str) -> Option<u32> {
    DIGIT_RUN
        .find(text)
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
}

/// Returns the trimmed label, or `None` when it is blank or a missing-value
/// sentinel such as `nan` or `N/A`.
pub fn label_text(cell: &Cell) -> Option<String> {
    let text = cell.as_text();
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if MISSING_SENTINELS.contains(&lowered.as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rectangular matrix of cells addressed by zero-based `(row, column)`.
///
/// Rows may be ragged; reads outside a row resolve to [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGrid {
    rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl CellGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns in the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}
