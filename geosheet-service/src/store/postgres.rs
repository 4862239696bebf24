//! PostgreSQL feature-store backend.
//!
//! Maps each feature type to a table. Attribute values travel as text in
//! both directions: writes bind the plain-string form of each value and
//! reads surface column contents as strings, so tables are expected to
//! carry attribute columns as `TEXT` (geometry as WKT). Table and column
//! names come from the configured attribute set and options, not from row
//! data.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Postgres, Row as _, Transaction};
use tracing::info;

use geosheet_core::attributes::value_to_string;
use geosheet_core::error::{StoreError, StoreResult};
use geosheet_core::feature::{Feature, FeatureId, Property};
use geosheet_core::store::{FeatureHandle, FeatureStore, StoreTransaction};

/// Options for the Postgres backend.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    /// Database connection string
    pub connection_string: String,

    /// Schema qualifier for all tables (search-path default when `None`)
    pub schema_name: Option<String>,

    /// Feature type to table name mapping (identity when absent)
    pub table_mapping: HashMap<String, String>,

    /// Identifier column per feature type (`fid` when absent)
    pub id_columns: HashMap<String, String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            schema_name: None,
            table_mapping: HashMap::new(),
            id_columns: HashMap::new(),
            max_connections: 5,
        }
    }
}

/// PostgreSQL [`FeatureStore`] backed by a connection pool.
pub struct PostgresStore {
    pool: PgPool,
    options: PostgresOptions,
}

impl PostgresStore {
    /// Connect a pool using `options`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the connection fails.
    pub async fn connect(options: PostgresOptions) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .connect(&options.connection_string)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect to PostgreSQL: {e}")))?;
        info!("connected to PostgreSQL feature store");
        Ok(Self { pool, options })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn with_pool(pool: PgPool, options: PostgresOptions) -> Self {
        Self { pool, options }
    }

    fn table(&self, type_name: &str) -> String {
        let table = self
            .options
            .table_mapping
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| type_name.to_string());
        match &self.options.schema_name {
            Some(schema) => format!("{schema}.{table}"),
            None => table,
        }
    }

    fn id_column(&self, type_name: &str) -> String {
        self.options
            .id_columns
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| "fid".to_string())
    }
}

#[async_trait]
impl FeatureStore for PostgresStore {
    async fn handle(&self, type_name: &str) -> StoreResult<Box<dyn FeatureHandle>> {
        Ok(Box::new(PostgresHandle {
            pool: self.pool.clone(),
            type_name: type_name.to_string(),
            table: self.table(type_name),
            id_column: self.id_column(type_name),
        }))
    }
}

struct PostgresHandle {
    pool: PgPool,
    type_name: String,
    table: String,
    id_column: String,
}

#[async_trait]
impl FeatureHandle for PostgresHandle {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn begin(&self, operation: &str) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            StoreError::Backend(format!("failed to begin '{operation}' transaction: {e}"))
        })?;
        Ok(Box::new(PostgresTransaction {
            tx: Some(tx),
            type_name: self.type_name.clone(),
            table: self.table.clone(),
            id_column: self.id_column.clone(),
        }))
    }
}

struct PostgresTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    type_name: String,
    table: String,
    id_column: String,
}

impl PostgresTransaction {
    fn tx(&mut self) -> StoreResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))
    }

    fn feature_from_row(&self, row: &PgRow) -> StoreResult<Feature> {
        let mut id = None;
        let mut properties = Vec::new();
        for (i, column) in row.columns().iter().enumerate() {
            let value: Option<String> = row.try_get(i).unwrap_or(None);
            if column.name() == self.id_column {
                id = value;
                continue;
            }
            let value = value.map_or(JsonValue::Null, JsonValue::String);
            properties.push(Property::new(column.name(), value));
        }
        let id = id.ok_or_else(|| {
            StoreError::Backend(format!(
                "record of type '{}' has no '{}' identifier",
                self.type_name, self.id_column
            ))
        })?;
        Ok(Feature::new(FeatureId::new(id), &self.type_name, properties))
    }
}

/// Plain-string form of a property value; null stays SQL `NULL`.
fn sql_text(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value_to_string(value))
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn query_by_id(&mut self, id: &FeatureId) -> StoreResult<Vec<Feature>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1",
            self.table, self.id_column
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_all(&mut **self.tx()?)
            .await
            .map_err(|e| StoreError::Backend(format!("query failed: {e}")))?;
        rows.iter().map(|row| self.feature_from_row(row)).collect()
    }

    async fn insert_many(&mut self, features: &[Feature]) -> StoreResult<()> {
        for feature in features {
            let named: Vec<&Property> = feature
                .properties()
                .iter()
                .filter(|p| !p.is_sentinel())
                .collect();

            let mut columns = vec![self.id_column.clone()];
            columns.extend(named.iter().map(|p| p.name.clone()));
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("${i}")).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            );

            let mut query = sqlx::query(&sql).bind(feature.id().as_str().to_string());
            for property in &named {
                query = query.bind(sql_text(&property.value));
            }
            query
                .execute(&mut **self.tx()?)
                .await
                .map_err(|e| StoreError::Backend(format!("insert failed: {e}")))?;
        }
        Ok(())
    }

    async fn modify(&mut self, id: &FeatureId, properties: &[Property]) -> StoreResult<()> {
        if properties.is_empty() {
            return Ok(());
        }
        let assignments: Vec<String> = properties
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} = ${}", p.name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            self.table,
            assignments.join(", "),
            self.id_column,
            properties.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for property in properties {
            query = query.bind(sql_text(&property.value));
        }
        query = query.bind(id.as_str().to_string());
        query
            .execute(&mut **self.tx()?)
            .await
            .map_err(|e| StoreError::Backend(format!("update failed: {e}")))?;
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(format!("commit failed: {e}")))
    }

    async fn close(&mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| StoreError::Backend(format!("rollback failed: {e}"))),
            None => Ok(()),
        }
    }
}
