//! Cell, row, and sheet model.
//!
//! A [`Sheet`] is the consumed spreadsheet collaborator: it exposes its
//! display name, row access by 0-based index, and in-order iteration over
//! the rows it actually contains. Parsing a workbook container into this
//! shape is someone else's job; `geosheet-service` ships a calamine-backed
//! adapter that produces the dense [`GridSheet`] implementation below.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

pub(crate) static EMPTY_CELL: CellValue = CellValue::Empty;

/// A single spreadsheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty or missing cell
    Empty,
    /// Text cell
    Text(String),
    /// Integer cell
    Int(i64),
    /// Floating point cell
    Float(f64),
    /// Boolean cell
    Bool(bool),
    /// Date/time cell
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// True for [`CellValue::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Convert the cell into the raw JSON value extraction rules work on.
    ///
    /// Non-finite floats have no JSON representation and collapse to null.
    #[must_use]
    pub fn to_value(&self) -> JsonValue {
        match self {
            CellValue::Empty => JsonValue::Null,
            CellValue::Text(s) => JsonValue::String(s.clone()),
            CellValue::Int(i) => JsonValue::Number((*i).into()),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::DateTime(dt) => {
                JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        }
    }
}

/// One sheet row: a 0-based index plus its cells in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: u32,
    cells: Vec<CellValue>,
}

impl Row {
    /// Build a row positioned at `index` in its sheet.
    #[must_use]
    pub fn new(index: u32, cells: Vec<CellValue>) -> Self {
        Self { index, cells }
    }

    /// 0-based position of the row in its sheet.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// 1-based row number, as displayed in spreadsheet applications.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.index + 1
    }

    /// Cell at `column`; [`CellValue::Empty`] when the row is shorter.
    #[must_use]
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// All cells of the row in column order.
    #[must_use]
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    /// True when every cell of the row is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// Sequential row access to one worksheet.
pub trait Sheet: Send + Sync {
    /// Display name of the sheet.
    fn name(&self) -> &str;

    /// Row at `index`, or `None` when the sheet has no such row.
    fn row(&self, index: u32) -> Option<&Row>;

    /// The rows the sheet actually contains, in index order.
    fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_>;
}

/// Dense in-memory [`Sheet`] backed by a row vector.
#[derive(Debug, Clone, Default)]
pub struct GridSheet {
    name: String,
    rows: Vec<Row>,
}

impl GridSheet {
    /// Empty sheet with the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Sheet populated from rows of cells, indexed in order.
    #[must_use]
    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Self::new(name);
        for cells in rows {
            sheet.push_row(cells);
        }
        sheet
    }

    /// Append a row at the next index.
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        let index = self.rows.len() as u32;
        self.rows.push(Row::new(index, cells));
    }

    /// Number of rows in the sheet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the sheet has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Sheet for GridSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(index as usize)
    }

    fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        Box::new(self.rows.iter())
    }
}
