//! Context updaters: auxiliary per-row state derivation.

use geosheet_core::context::SheetContext;

use crate::error::ProcessResult;

/// Updates auxiliary context state as rows advance.
///
/// Invoked exactly once per in-bounds row, after the row is attached to
/// the context and before the ignore check and feature construction. Used
/// for stateful derivations, e.g. tracking a changing section header that
/// later bounds or attribute logic depends on.
pub trait ContextUpdater: Send + Sync {
    /// Update auxiliary state from the current row.
    ///
    /// # Errors
    ///
    /// Failures propagate as row-processing errors and abort the sheet.
    fn update(&self, context: &mut SheetContext<'_>) -> ProcessResult<()>;
}

/// Updater for sheets that need no derived state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContextUpdater;

impl ContextUpdater for NoopContextUpdater {
    fn update(&self, _context: &mut SheetContext<'_>) -> ProcessResult<()> {
        Ok(())
    }
}

/// Tracks the most recent section header into the context aux state.
///
/// A row counts as a section header when its marker column is populated
/// while every other cell is empty; the marker value is stored under the
/// configured key and stays current until the next header row. Header
/// rows themselves are typically ignored by the bounds detector while
/// their label feeds later extraction (see `AuxExtractor`).
#[derive(Debug, Clone)]
pub struct SectionLabelUpdater {
    marker_column: usize,
    aux_key: String,
}

impl SectionLabelUpdater {
    /// Track headers in `marker_column` under `aux_key`.
    pub fn new(marker_column: usize, aux_key: impl Into<String>) -> Self {
        Self {
            marker_column,
            aux_key: aux_key.into(),
        }
    }
}

impl ContextUpdater for SectionLabelUpdater {
    fn update(&self, context: &mut SheetContext<'_>) -> ProcessResult<()> {
        let Some(row) = context.row() else {
            return Ok(());
        };
        let marker = row.cell(self.marker_column);
        if marker.is_empty() {
            return Ok(());
        }
        let alone = row
            .cells()
            .iter()
            .enumerate()
            .all(|(i, cell)| i == self.marker_column || cell.is_empty());
        if alone {
            let label = marker.to_value();
            context.set_aux(self.aux_key.clone(), label);
        }
        Ok(())
    }
}
