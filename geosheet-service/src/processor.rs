//! Sheet processing orchestration.

use tracing::{debug, info};

use geosheet_core::attributes::AttributeSet;
use geosheet_core::context::SheetContext;
use geosheet_core::feature::FeatureSchema;
use geosheet_core::sheet::{Row, Sheet};
use geosheet_core::store::FeatureStore;

use crate::bounds::BoundsDetector;
use crate::builder;
use crate::error::{ProcessError, ProcessResult};
use crate::store::gateway;
use crate::update::ContextUpdater;

/// Outcome of one row iteration.
enum RowStep {
    /// End of data reached; the row was not processed
    Stop,
    /// Row skipped by the ignore predicate
    Skipped,
    /// Feature built and reconciled against the store
    Persisted,
}

/// Drives the per-sheet loop: find the data start, iterate rows, apply
/// the context updater, consult the bounds detector, build and persist
/// features, stop at end-of-data or sheet exhaustion.
///
/// Processing moves through three phases: searching for the data start,
/// processing rows, and done — reached either through the detector's
/// end-of-data signal or by running out of rows.
pub struct SheetProcessor {
    attributes: AttributeSet,
    bounds: Box<dyn BoundsDetector>,
    updater: Box<dyn ContextUpdater>,
    schema: FeatureSchema,
}

impl SheetProcessor {
    /// Build a processor for one table.
    ///
    /// The feature schema is derived here, once, and reused for every row
    /// of every sheet this processor handles.
    #[must_use]
    pub fn new(
        table_name: &str,
        attributes: AttributeSet,
        bounds: Box<dyn BoundsDetector>,
        updater: Box<dyn ContextUpdater>,
    ) -> Self {
        let schema = builder::build_schema(table_name, &attributes);
        Self {
            attributes,
            bounds,
            updater,
            schema,
        }
    }

    /// The schema every produced feature conforms to.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Process one sheet into `store`.
    ///
    /// Row advancement is strictly sequential by row index; rows committed
    /// before a failure stay committed.
    ///
    /// # Errors
    ///
    /// Any failure while handling a specific row is wrapped with the
    /// 1-based row number and sheet name and aborts the rest of the sheet.
    pub async fn process(&self, sheet: &dyn Sheet, store: &dyn FeatureStore) -> ProcessResult<()> {
        info!(
            sheet = sheet.name(),
            table = self.schema.type_name(),
            "start processing sheet"
        );

        let mut context = SheetContext::new(sheet, store);
        let mut current = self.find_data_start(&mut context)?;
        let mut persisted = 0usize;

        while let Some(row) = current {
            let row_number = row.number();
            context.set_row(row.clone());
            match self.process_row(&mut context).await {
                Ok(RowStep::Stop) => break,
                Ok(RowStep::Persisted) => persisted += 1,
                Ok(RowStep::Skipped) => {
                    debug!(row = row_number, "row ignored");
                }
                Err(source) => {
                    return Err(ProcessError::for_row(row_number, sheet.name(), source));
                }
            }
            current = sheet.row(row.index() + 1).cloned();
        }

        info!(
            sheet = sheet.name(),
            features = persisted,
            "finished processing sheet"
        );
        Ok(())
    }

    /// Scan from the first row for the one the detector accepts as the
    /// start of data.
    fn find_data_start(&self, context: &mut SheetContext<'_>) -> ProcessResult<Option<Row>> {
        let sheet = context.sheet();
        for row in sheet.rows() {
            context.set_row(row.clone());
            if self.bounds.data_start(context)? {
                debug!(row = row.number(), "data start detected");
                return Ok(Some(row.clone()));
            }
        }
        debug!(sheet = sheet.name(), "no data start found");
        Ok(None)
    }

    /// Steps b–e of the per-row iteration, with the row already attached.
    async fn process_row(&self, context: &mut SheetContext<'_>) -> ProcessResult<RowStep> {
        if self.bounds.data_end(context)? {
            return Ok(RowStep::Stop);
        }
        self.updater.update(context)?;
        if self.bounds.ignore(context)? {
            return Ok(RowStep::Skipped);
        }
        let feature = builder::build_feature(&self.schema, context, &self.attributes)?;
        gateway::persist(context.store(), &feature).await?;
        Ok(RowStep::Persisted)
    }
}
