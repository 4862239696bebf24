//! Excel worksheet adapter.
//!
//! Converts an already-parsed calamine worksheet range into the dense
//! [`GridSheet`] the processor works on. Cell semantics follow the
//! spreadsheet: formula error cells carry no usable value and come
//! through empty.

use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::NaiveDateTime;

use geosheet_core::sheet::{CellValue, GridSheet};

use crate::error::{ProcessError, ProcessResult};

/// Convert one worksheet range into a [`GridSheet`] named `name`.
#[must_use]
pub fn sheet_from_range(name: &str, range: &Range<Data>) -> GridSheet {
    let mut sheet = GridSheet::new(name);
    for row in range.rows() {
        sheet.push_row(row.iter().map(convert_cell).collect());
    }
    sheet
}

/// Open `path` as an XLSX workbook and adapt one worksheet — the named
/// one, or the first when `sheet_name` is `None`.
///
/// # Errors
///
/// Returns [`ProcessError::Sheet`] when the workbook cannot be opened or
/// the worksheet cannot be read.
pub fn open_sheet(path: &Path, sheet_name: Option<&str>) -> ProcessResult<GridSheet> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ProcessError::Sheet(format!("failed to open Excel file: {e}")))?;

    let name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ProcessError::Sheet("workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| ProcessError::Sheet(format!("failed to read sheet '{name}': {e}")))?;
    Ok(sheet_from_range(&name, &range))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Empty, CellValue::DateTime),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map_or_else(|_| CellValue::Text(s.clone()), CellValue::DateTime),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosheet_core::sheet::Sheet;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_rows_become_grid_rows() {
        let mut range: Range<Data> = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), Data::String("plot".to_string()));
        range.set_value((0, 1), Data::String("name".to_string()));
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::String("Fen".to_string()));

        let sheet = sheet_from_range("plots", &range);
        assert_eq!(sheet.name(), "plots");
        assert_eq!(sheet.len(), 2);
        assert_eq!(
            sheet.row(1).map(|r| r.cell(0).clone()),
            Some(CellValue::Float(1.0))
        );
    }

    #[test]
    fn error_cells_come_through_empty() {
        assert_eq!(
            convert_cell(&Data::Error(calamine::CellErrorType::Div0)),
            CellValue::Empty
        );
        assert_eq!(convert_cell(&Data::Bool(true)), CellValue::Bool(true));
    }
}
