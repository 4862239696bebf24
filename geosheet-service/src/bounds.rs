//! Bounds detection: where usable data begins and ends.

use geosheet_core::context::SheetContext;

use crate::error::ProcessResult;

/// Decides where usable data begins/ends and which rows to skip.
///
/// Per iteration the processor checks `data_end` first, then runs the
/// context updater, then checks `ignore`. Implementations are free to
/// judge rows by content, position, or accumulated context state.
pub trait BoundsDetector: Send + Sync {
    /// True when the current row is the first row of usable data.
    ///
    /// The sheet is scanned sequentially from the top; the first row for
    /// which this returns true becomes the initial position. When no row
    /// satisfies it, processing yields zero features.
    fn data_start(&self, context: &SheetContext<'_>) -> ProcessResult<bool>;

    /// True when the current row signals the end of usable data.
    ///
    /// Evaluated after advancing to each new row; when true, iteration
    /// stops without processing that row.
    fn data_end(&self, context: &SheetContext<'_>) -> ProcessResult<bool>;

    /// True when the current row should be skipped without ending
    /// iteration.
    fn ignore(&self, context: &SheetContext<'_>) -> ProcessResult<bool>;
}

/// Bounds from explicit row indices.
///
/// Data starts at `start_row` (0-based) and optionally ends at the first
/// row whose index reaches `end_row`. Blank rows inside the region are
/// ignored unless configured otherwise.
#[derive(Debug, Clone)]
pub struct RowSpanBounds {
    start_row: u32,
    end_row: Option<u32>,
    skip_blank: bool,
}

impl RowSpanBounds {
    /// Open-ended span starting at `start_row`.
    #[must_use]
    pub fn new(start_row: u32) -> Self {
        Self {
            start_row,
            end_row: None,
            skip_blank: true,
        }
    }

    /// Span ending before `end_row` (the first index past the data).
    #[must_use]
    pub fn with_end(start_row: u32, end_row: u32) -> Self {
        Self {
            start_row,
            end_row: Some(end_row),
            skip_blank: true,
        }
    }

    /// Whether blank rows inside the span are ignored (default true).
    #[must_use]
    pub fn skip_blank(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }
}

impl BoundsDetector for RowSpanBounds {
    fn data_start(&self, context: &SheetContext<'_>) -> ProcessResult<bool> {
        Ok(context.row().is_some_and(|r| r.index() >= self.start_row))
    }

    fn data_end(&self, context: &SheetContext<'_>) -> ProcessResult<bool> {
        Ok(self
            .end_row
            .is_some_and(|end| context.row().is_some_and(|r| r.index() >= end)))
    }

    fn ignore(&self, context: &SheetContext<'_>) -> ProcessResult<bool> {
        Ok(self.skip_blank && context.row().is_some_and(|r| r.is_blank()))
    }
}

/// Bounds driven by a key column.
///
/// Data starts on the first row at or below the header block whose key
/// cell is populated, and ends on the first row whose key cell is empty
/// again.
#[derive(Debug, Clone)]
pub struct KeyColumnBounds {
    key_column: usize,
    first_candidate_row: u32,
}

impl KeyColumnBounds {
    /// Bounds keyed on the 0-based `key_column`.
    #[must_use]
    pub fn new(key_column: usize) -> Self {
        Self {
            key_column,
            first_candidate_row: 0,
        }
    }

    /// Treat the first `rows` rows as header, never as data.
    #[must_use]
    pub fn skip_header_rows(mut self, rows: u32) -> Self {
        self.first_candidate_row = rows;
        self
    }
}

impl BoundsDetector for KeyColumnBounds {
    fn data_start(&self, context: &SheetContext<'_>) -> ProcessResult<bool> {
        let in_range = context
            .row()
            .is_some_and(|r| r.index() >= self.first_candidate_row);
        Ok(in_range && !context.cell(self.key_column).is_empty())
    }

    fn data_end(&self, context: &SheetContext<'_>) -> ProcessResult<bool> {
        Ok(context.cell(self.key_column).is_empty())
    }

    fn ignore(&self, _context: &SheetContext<'_>) -> ProcessResult<bool> {
        Ok(false)
    }
}
