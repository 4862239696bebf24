//! Attribute descriptors, extraction rules, and identity derivation.
//!
//! An [`AttributeSet`] is the configuration one table is ingested with: an
//! ordered list of [`Attribute`] descriptors (name, semantic kind,
//! extraction rule) plus the [`IdentityRule`] that derives a stable
//! feature identifier from a row. The set is built once and shared
//! read-only across every row of a sheet.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::context::SheetContext;
use crate::error::{AttributeError, AttributeResult};
use crate::feature::FeatureId;

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Free text
    String,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
    /// Calendar date, canonical form `YYYY-MM-DD`
    Date,
    /// Date and time, canonical form `YYYY-MM-DDTHH:MM:SS`
    DateTime,
    /// Geometry carried as WKT text, never parsed here
    Geometry,
}

impl AttributeKind {
    /// Normalize `raw` into the canonical JSON value for this kind.
    ///
    /// The contract is deliberately minimal: null passes through untouched,
    /// values already of the right shape are canonicalized, and everything
    /// else is a conversion error naming the attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::TypeConversion`] when `raw` does not fit
    /// the kind.
    pub fn coerce(self, attribute: &str, raw: JsonValue) -> AttributeResult<JsonValue> {
        if raw.is_null() {
            return Ok(JsonValue::Null);
        }
        match (self, raw) {
            (AttributeKind::String, JsonValue::String(s)) => Ok(JsonValue::String(s)),
            (AttributeKind::String, other) => Ok(JsonValue::String(value_to_string(&other))),

            (AttributeKind::Integer, JsonValue::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    return Ok(JsonValue::Number(n));
                }
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.is_finite() && f.fract() == 0.0 {
                    Ok(JsonValue::Number((f as i64).into()))
                } else {
                    Err(self.conversion_error(attribute, &JsonValue::Number(n)))
                }
            }
            (AttributeKind::Integer, JsonValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(JsonValue::Number(i.into())),
                Err(_) => Err(self.conversion_error(attribute, &JsonValue::String(s))),
            },

            (AttributeKind::Float, JsonValue::Number(n)) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .ok_or_else(|| self.conversion_error(attribute, &JsonValue::Number(n.clone()))),
            (AttributeKind::Float, JsonValue::String(s)) => {
                match s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                    Some(n) => Ok(JsonValue::Number(n)),
                    None => Err(self.conversion_error(attribute, &JsonValue::String(s))),
                }
            }

            (AttributeKind::Boolean, JsonValue::Bool(b)) => Ok(JsonValue::Bool(b)),
            (AttributeKind::Boolean, JsonValue::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(JsonValue::Bool(true)),
                    "false" => Ok(JsonValue::Bool(false)),
                    _ => Err(self.conversion_error(attribute, &JsonValue::String(s))),
                }
            }

            (AttributeKind::Date, JsonValue::String(s)) => match parse_date(s.trim()) {
                Some(d) => Ok(JsonValue::String(d.format("%Y-%m-%d").to_string())),
                None => Err(self.conversion_error(attribute, &JsonValue::String(s))),
            },
            (AttributeKind::DateTime, JsonValue::String(s)) => match parse_datetime(s.trim()) {
                Some(dt) => Ok(JsonValue::String(
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                )),
                None => Err(self.conversion_error(attribute, &JsonValue::String(s))),
            },

            (AttributeKind::Geometry, JsonValue::String(wkt)) => Ok(JsonValue::String(wkt)),

            (_, other) => Err(self.conversion_error(attribute, &other)),
        }
    }

    fn conversion_error(self, attribute: &str, raw: &JsonValue) -> AttributeError {
        AttributeError::TypeConversion {
            attribute: attribute.to_string(),
            expected: self,
            value: raw.to_string(),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::String => "string",
            AttributeKind::Integer => "integer",
            AttributeKind::Float => "float",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Date => "date",
            AttributeKind::DateTime => "datetime",
            AttributeKind::Geometry => "geometry",
        };
        f.write_str(name)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Plain-text form of a JSON value, for identifiers and text columns.
///
/// Strings render without quotes; null renders empty.
#[must_use]
pub fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extraction rule mapping the current row/context to a raw attribute value.
///
/// Implementations report failure through [`AttributeError`]; coercion to
/// the attribute kind happens afterwards, in the feature builder. Plain
/// closures of the right shape implement this trait.
pub trait ExtractValue: Send + Sync {
    /// Produce the raw value for the context's current row.
    fn extract(&self, context: &SheetContext<'_>) -> AttributeResult<JsonValue>;
}

impl<F> ExtractValue for F
where
    F: Fn(&SheetContext<'_>) -> AttributeResult<JsonValue> + Send + Sync,
{
    fn extract(&self, context: &SheetContext<'_>) -> AttributeResult<JsonValue> {
        self(context)
    }
}

/// Extracts the cell at a fixed column of the current row.
#[derive(Debug, Clone, Copy)]
pub struct ColumnExtractor {
    column: usize,
}

impl ColumnExtractor {
    /// Rule reading the 0-based `column` of each row.
    #[must_use]
    pub fn new(column: usize) -> Self {
        Self { column }
    }
}

impl ExtractValue for ColumnExtractor {
    fn extract(&self, context: &SheetContext<'_>) -> AttributeResult<JsonValue> {
        Ok(context.cell(self.column).to_value())
    }
}

/// Extracts the same fixed value on every row.
#[derive(Debug, Clone)]
pub struct ConstantExtractor {
    value: JsonValue,
}

impl ConstantExtractor {
    /// Rule producing `value` for every row.
    #[must_use]
    pub fn new(value: JsonValue) -> Self {
        Self { value }
    }
}

impl ExtractValue for ConstantExtractor {
    fn extract(&self, _context: &SheetContext<'_>) -> AttributeResult<JsonValue> {
        Ok(self.value.clone())
    }
}

/// Extracts a value from the context auxiliary state.
///
/// Pairs with a context updater that maintains the state as rows advance,
/// e.g. a section label tracked from header rows.
#[derive(Debug, Clone)]
pub struct AuxExtractor {
    key: String,
}

impl AuxExtractor {
    /// Rule reading the auxiliary value stored under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl ExtractValue for AuxExtractor {
    fn extract(&self, context: &SheetContext<'_>) -> AttributeResult<JsonValue> {
        Ok(context.aux(&self.key).cloned().unwrap_or(JsonValue::Null))
    }
}

/// One attribute descriptor: name, semantic kind, extraction rule.
///
/// Immutable once constructed; shared read-only across all rows of a
/// sheet.
#[derive(Clone)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
    extractor: Arc<dyn ExtractValue>,
}

impl Attribute {
    /// Descriptor with an explicit extraction rule.
    pub fn new(
        name: impl Into<String>,
        kind: AttributeKind,
        extractor: impl ExtractValue + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            extractor: Arc::new(extractor),
        }
    }

    /// Attribute read from a fixed 0-based column of each row.
    pub fn column(name: impl Into<String>, kind: AttributeKind, column: usize) -> Self {
        Self::new(name, kind, ColumnExtractor::new(column))
    }

    /// Attribute with the same value on every row.
    pub fn constant(name: impl Into<String>, kind: AttributeKind, value: JsonValue) -> Self {
        Self::new(name, kind, ConstantExtractor::new(value))
    }

    /// Attribute read from the context auxiliary state under `key`.
    pub fn from_aux(name: impl Into<String>, kind: AttributeKind, key: impl Into<String>) -> Self {
        Self::new(name, kind, AuxExtractor::new(key))
    }

    /// Attribute name, unique within its set.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semantic kind of the attribute.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Run the extraction rule against the current row.
    ///
    /// # Errors
    ///
    /// Propagates the rule's [`AttributeError`].
    pub fn extract(&self, context: &SheetContext<'_>) -> AttributeResult<JsonValue> {
        self.extractor.extract(context)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Derives the stable identifier of the feature built from the current row.
///
/// The derivation must be deterministic over the same row data, so that
/// re-running a sheet finds the records it created the first time.
pub trait IdentityRule: Send + Sync {
    /// Derive the identifier for a feature of `type_name` with the given
    /// coerced attribute `values`.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Identity`] when no identifier can be
    /// derived from the row.
    fn derive(
        &self,
        type_name: &str,
        values: &IndexMap<String, JsonValue>,
        context: &SheetContext<'_>,
    ) -> AttributeResult<FeatureId>;
}

/// Identity from one or more key attributes: `<type>.<v1>[-<v2>...]`.
#[derive(Debug, Clone)]
pub struct KeyAttributeIdentity {
    keys: Vec<String>,
}

impl KeyAttributeIdentity {
    /// Identity derived from a single key attribute.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
        }
    }

    /// Identity derived from several key attributes, joined in order.
    #[must_use]
    pub fn composite(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl IdentityRule for KeyAttributeIdentity {
    fn derive(
        &self,
        type_name: &str,
        values: &IndexMap<String, JsonValue>,
        _context: &SheetContext<'_>,
    ) -> AttributeResult<FeatureId> {
        let mut parts = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            match values.get(key) {
                Some(value) if !value.is_null() => parts.push(value_to_string(value)),
                _ => {
                    return Err(AttributeError::Identity(format!(
                        "key attribute '{key}' has no value"
                    )));
                }
            }
        }
        Ok(FeatureId::new(format!("{type_name}.{}", parts.join("-"))))
    }
}

/// Identity from the sheet row position, for tables without a natural key.
///
/// Stable across re-runs of the same sheet, but not across row
/// insertions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowPositionIdentity;

impl IdentityRule for RowPositionIdentity {
    fn derive(
        &self,
        type_name: &str,
        _values: &IndexMap<String, JsonValue>,
        context: &SheetContext<'_>,
    ) -> AttributeResult<FeatureId> {
        let row = context
            .row()
            .ok_or_else(|| AttributeError::Identity("no current row".to_string()))?;
        Ok(FeatureId::new(format!("{type_name}.{}", row.number())))
    }
}

/// Ordered attribute descriptors plus the identity rule for the features
/// built from them.
#[derive(Clone)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
    identity: Arc<dyn IdentityRule>,
}

impl AttributeSet {
    /// Build a set from descriptors and an identity rule.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidSet`] when two attributes share a
    /// name.
    pub fn new(
        attributes: Vec<Attribute>,
        identity: impl IdentityRule + 'static,
    ) -> AttributeResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name().to_string()) {
                return Err(AttributeError::InvalidSet(format!(
                    "duplicate attribute name '{}'",
                    attribute.name()
                )));
            }
        }
        Ok(Self {
            attributes,
            identity: Arc::new(identity),
        })
    }

    /// Descriptors in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The identity rule for features built from this set.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityRule {
        self.identity.as_ref()
    }

    /// Number of attributes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when the set has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSet")
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn coerce_integer_from_spreadsheet_shapes() {
        let kind = AttributeKind::Integer;
        assert_eq!(kind.coerce("n", json!(3)).unwrap(), json!(3));
        // Spreadsheets routinely deliver whole numbers as floats.
        assert_eq!(kind.coerce("n", json!(3.0)).unwrap(), json!(3));
        assert_eq!(kind.coerce("n", json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(kind.coerce("n", json!(null)).unwrap(), json!(null));
        assert!(kind.coerce("n", json!(3.5)).is_err());
        assert!(kind.coerce("n", json!("x")).is_err());
    }

    #[test]
    fn coerce_string_is_lenient() {
        let kind = AttributeKind::String;
        assert_eq!(kind.coerce("s", json!("a")).unwrap(), json!("a"));
        assert_eq!(kind.coerce("s", json!(7)).unwrap(), json!("7"));
        assert_eq!(kind.coerce("s", json!(true)).unwrap(), json!("true"));
    }

    #[test]
    fn coerce_date_canonicalizes() {
        let kind = AttributeKind::Date;
        assert_eq!(
            kind.coerce("d", json!("2024-03-01")).unwrap(),
            json!("2024-03-01")
        );
        assert_eq!(
            kind.coerce("d", json!("2024-03-01T10:30:00")).unwrap(),
            json!("2024-03-01")
        );
        assert!(kind.coerce("d", json!("yesterday")).is_err());
        assert!(kind.coerce("d", json!(20240301)).is_err());
    }

    #[test]
    fn coerce_geometry_passes_wkt_through() {
        let kind = AttributeKind::Geometry;
        let wkt = json!("POINT (30 10)");
        assert_eq!(kind.coerce("geom", wkt.clone()).unwrap(), wkt);
        assert!(kind.coerce("geom", json!(1)).is_err());
    }

    #[test]
    fn conversion_error_names_the_attribute() {
        let err = AttributeKind::Boolean.coerce("flag", json!(12)).unwrap_err();
        assert!(err.to_string().contains("'flag'"));
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn duplicate_attribute_names_are_rejected() {
        let result = AttributeSet::new(
            vec![
                Attribute::column("a", AttributeKind::String, 0),
                Attribute::column("a", AttributeKind::Integer, 1),
            ],
            RowPositionIdentity,
        );
        assert!(matches!(result, Err(AttributeError::InvalidSet(_))));
    }

    #[test]
    fn value_to_string_forms() {
        assert_eq!(value_to_string(&json!("a")), "a");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(null)), "");
        assert_eq!(value_to_string(&json!(false)), "false");
    }
}
