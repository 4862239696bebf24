//! Processing error type.

use thiserror::Error;

use geosheet_core::error::{AttributeError, StoreError};

/// Error raised while processing a sheet.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failure attributed to one specific row
    #[error("error processing row {row} of sheet '{sheet}'")]
    Row {
        /// 1-based row number, as displayed in spreadsheet applications
        row: u32,
        /// Display name of the sheet
        sheet: String,
        /// Underlying cause
        #[source]
        source: Box<ProcessError>,
    },

    /// Attribute extraction or coercion failure
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Store access failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bounds detector failure
    #[error("bounds detection error: {0}")]
    Bounds(String),

    /// Context updater failure
    #[error("context update error: {0}")]
    Context(String),

    /// Sheet source failure (opening or adapting a worksheet)
    #[error("sheet source error: {0}")]
    Sheet(String),
}

impl ProcessError {
    /// Wrap an error with the 1-based row number and sheet it occurred on.
    #[must_use]
    pub fn for_row(row: u32, sheet: impl Into<String>, source: ProcessError) -> Self {
        ProcessError::Row {
            row,
            sheet: sheet.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for sheet processing.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
