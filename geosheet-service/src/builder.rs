//! Feature construction from rows.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use geosheet_core::attributes::AttributeSet;
use geosheet_core::context::SheetContext;
use geosheet_core::feature::{Feature, FeatureSchema, Property};

use crate::error::ProcessResult;

/// Derive the feature schema for one table from its attribute set.
///
/// Deterministic for the same table name and attributes. The processor
/// calls this once per run and reuses the schema for every row; it is
/// never regenerated per row.
#[must_use]
pub fn build_schema(table_name: &str, attributes: &AttributeSet) -> FeatureSchema {
    let fields = attributes
        .attributes()
        .iter()
        .map(|a| (a.name().to_string(), a.kind()))
        .collect();
    FeatureSchema::new(table_name, fields)
}

/// Materialize one feature from the current row of `context`.
///
/// Runs every extraction rule, coerces each raw value to its attribute
/// kind, derives the identifier through the set's identity rule, and
/// assembles the properties in attribute order.
///
/// # Errors
///
/// Propagates extraction, coercion, and identity failures.
pub fn build_feature(
    schema: &FeatureSchema,
    context: &SheetContext<'_>,
    attributes: &AttributeSet,
) -> ProcessResult<Feature> {
    let mut values: IndexMap<String, JsonValue> = IndexMap::with_capacity(attributes.len());
    for attribute in attributes.attributes() {
        let raw = attribute.extract(context)?;
        let value = attribute.kind().coerce(attribute.name(), raw)?;
        values.insert(attribute.name().to_string(), value);
    }

    let id = attributes
        .identity()
        .derive(schema.type_name(), &values, context)?;
    debug!(feature = %id, "built feature from row");

    let properties = values
        .into_iter()
        .map(|(name, value)| Property::new(name, value))
        .collect();
    Ok(Feature::new(id, schema.type_name(), properties))
}
