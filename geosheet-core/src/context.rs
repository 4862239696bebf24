//! Per-sheet processing context.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::sheet::{CellValue, EMPTY_CELL, Row, Sheet};
use crate::store::FeatureStore;

/// Mutable cursor over one sheet-processing run.
///
/// Created once per `process` call; the current row is swapped out as
/// iteration advances, and auxiliary state accumulates whatever context
/// updaters derive along the way. Never shared across concurrently
/// processed sheets.
pub struct SheetContext<'a> {
    sheet: &'a dyn Sheet,
    store: &'a dyn FeatureStore,
    row: Option<Row>,
    aux: HashMap<String, JsonValue>,
}

impl<'a> SheetContext<'a> {
    /// Context over `sheet`, persisting into `store`.
    pub fn new(sheet: &'a dyn Sheet, store: &'a dyn FeatureStore) -> Self {
        Self {
            sheet,
            store,
            row: None,
            aux: HashMap::new(),
        }
    }

    /// The sheet being processed.
    #[must_use]
    pub fn sheet(&self) -> &'a dyn Sheet {
        self.sheet
    }

    /// The store features are reconciled against.
    #[must_use]
    pub fn store(&self) -> &'a dyn FeatureStore {
        self.store
    }

    /// Attach the row the loop is currently positioned on.
    pub fn set_row(&mut self, row: Row) {
        self.row = Some(row);
    }

    /// The current row, once one has been attached.
    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    /// Cell of the current row; [`CellValue::Empty`] when there is no
    /// current row or the row is shorter.
    #[must_use]
    pub fn cell(&self, column: usize) -> &CellValue {
        self.row.as_ref().map_or(&EMPTY_CELL, |r| r.cell(column))
    }

    /// Auxiliary value written by a context updater.
    #[must_use]
    pub fn aux(&self, key: &str) -> Option<&JsonValue> {
        self.aux.get(key)
    }

    /// Store an auxiliary value for later rows to read.
    pub fn set_aux(&mut self, key: impl Into<String>, value: JsonValue) {
        self.aux.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;
    use crate::sheet::GridSheet;
    use crate::store::FeatureHandle;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct NullStore;

    #[async_trait]
    impl FeatureStore for NullStore {
        async fn handle(&self, type_name: &str) -> StoreResult<Box<dyn FeatureHandle>> {
            Err(crate::error::StoreError::Backend(format!(
                "no handle for '{type_name}'"
            )))
        }
    }

    #[test]
    fn row_cursor_and_aux_state() {
        let sheet = GridSheet::with_rows("s", vec![vec![CellValue::Int(5)]]);
        let store = NullStore;
        let mut context = SheetContext::new(&sheet, &store);

        assert!(context.row().is_none());
        assert_eq!(context.cell(0), &CellValue::Empty);

        context.set_row(sheet.row(0).cloned().unwrap_or_else(|| Row::new(0, vec![])));
        assert_eq!(context.cell(0), &CellValue::Int(5));
        assert_eq!(context.cell(9), &CellValue::Empty);

        assert_eq!(context.aux("section"), None);
        context.set_aux("section", json!("herbaceous"));
        assert_eq!(context.aux("section"), Some(&json!("herbaceous")));
    }
}
