//! In-memory feature store.
//!
//! Reference implementation of the store contract and the test double
//! used across the integration tests. Mutations are buffered per
//! transaction and applied on commit; closing an uncommitted transaction
//! discards them. A journal records every committed mutation so tests can
//! assert on write minimality.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use geosheet_core::error::{StoreError, StoreResult};
use geosheet_core::feature::{Feature, FeatureId, Property};
use geosheet_core::store::{FeatureHandle, FeatureStore, StoreTransaction};

/// One committed mutation, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// Insert of `count` records into `type_name`
    Insert {
        /// Feature type the records were inserted into
        type_name: String,
        /// Number of inserted records
        count: usize,
    },
    /// Modify of one record naming exactly `properties`
    Modify {
        /// Feature type of the modified record
        type_name: String,
        /// Identifier of the modified record
        id: String,
        /// Names of the properties the modification carried
        properties: Vec<String>,
    },
}

#[derive(Default)]
struct Shared {
    tables: HashMap<String, Vec<Feature>>,
    journal: Vec<JournalEntry>,
}

/// In-memory [`FeatureStore`].
///
/// Cloning is cheap and shares the same underlying tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed records of `type_name`, in insertion order.
    #[must_use]
    pub fn records(&self, type_name: &str) -> Vec<Feature> {
        self.shared
            .lock()
            .tables
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Committed mutation journal, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.shared.lock().journal.clone()
    }

    /// Drop the journal, keeping the records (test setup).
    pub fn clear_journal(&self) {
        self.shared.lock().journal.clear();
    }

    /// Insert a record directly, bypassing transactions (test setup).
    pub fn seed(&self, feature: Feature) {
        let mut shared = self.shared.lock();
        shared
            .tables
            .entry(feature.type_name().to_string())
            .or_default()
            .push(feature);
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn handle(&self, type_name: &str) -> StoreResult<Box<dyn FeatureHandle>> {
        Ok(Box::new(MemoryHandle {
            type_name: type_name.to_string(),
            store: self.clone(),
        }))
    }
}

struct MemoryHandle {
    type_name: String,
    store: MemoryStore,
}

#[async_trait]
impl FeatureHandle for MemoryHandle {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn begin(&self, _operation: &str) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            type_name: self.type_name.clone(),
            store: self.store.clone(),
            pending: Vec::new(),
        }))
    }
}

enum PendingOp {
    Insert(Vec<Feature>),
    Modify {
        id: FeatureId,
        properties: Vec<Property>,
    },
}

struct MemoryTransaction {
    type_name: String,
    store: MemoryStore,
    pending: Vec<PendingOp>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn query_by_id(&mut self, id: &FeatureId) -> StoreResult<Vec<Feature>> {
        let shared = self.store.shared.lock();
        Ok(shared
            .tables
            .get(&self.type_name)
            .map(|records| {
                records
                    .iter()
                    .filter(|f| f.id() == id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_many(&mut self, features: &[Feature]) -> StoreResult<()> {
        self.pending.push(PendingOp::Insert(features.to_vec()));
        Ok(())
    }

    async fn modify(&mut self, id: &FeatureId, properties: &[Property]) -> StoreResult<()> {
        self.pending.push(PendingOp::Modify {
            id: id.clone(),
            properties: properties.to_vec(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let mut shared = self.store.shared.lock();
        for op in self.pending.drain(..) {
            match op {
                PendingOp::Insert(features) => {
                    let count = features.len();
                    shared
                        .tables
                        .entry(self.type_name.clone())
                        .or_default()
                        .extend(features);
                    shared.journal.push(JournalEntry::Insert {
                        type_name: self.type_name.clone(),
                        count,
                    });
                }
                PendingOp::Modify { id, properties } => {
                    let record = shared
                        .tables
                        .get_mut(&self.type_name)
                        .and_then(|records| records.iter_mut().find(|f| f.id() == &id))
                        .ok_or_else(|| {
                            StoreError::Backend(format!(
                                "no record '{id}' of type '{}' to modify",
                                self.type_name
                            ))
                        })?;
                    let mut names = Vec::with_capacity(properties.len());
                    for property in properties {
                        record.set_value(&property.name, property.value.clone());
                        names.push(property.name.clone());
                    }
                    shared.journal.push(JournalEntry::Modify {
                        type_name: self.type_name.clone(),
                        id: id.to_string(),
                        properties: names,
                    });
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plot(id: &str, name: &str) -> Feature {
        Feature::new(
            FeatureId::new(id),
            "plot",
            vec![Property::new("name", json!(name))],
        )
    }

    #[tokio::test]
    async fn commit_applies_buffered_work() {
        let store = MemoryStore::new();
        let handle = store.handle("plot").await.unwrap();

        let mut tx = handle.begin("create").await.unwrap();
        tx.insert_many(&[plot("plot.1", "A")]).await.unwrap();
        // Nothing is visible before commit.
        assert_eq!(store.records("plot").len(), 0);
        tx.commit().await.unwrap();
        tx.close().await.unwrap();

        assert_eq!(store.records("plot").len(), 1);
    }

    #[tokio::test]
    async fn close_without_commit_discards_work() {
        let store = MemoryStore::new();
        let handle = store.handle("plot").await.unwrap();

        let mut tx = handle.begin("create").await.unwrap();
        tx.insert_many(&[plot("plot.1", "A")]).await.unwrap();
        tx.close().await.unwrap();

        assert_eq!(store.records("plot").len(), 0);
        assert_eq!(store.journal(), Vec::new());
    }

    #[tokio::test]
    async fn modify_changes_one_record_in_place() {
        let store = MemoryStore::new();
        store.seed(plot("plot.1", "A"));
        store.seed(plot("plot.2", "B"));
        let handle = store.handle("plot").await.unwrap();

        let mut tx = handle.begin("update").await.unwrap();
        tx.modify(
            &FeatureId::new("plot.2"),
            &[Property::new("name", json!("C"))],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        tx.close().await.unwrap();

        let records = store.records("plot");
        assert_eq!(records[0].value("name"), Some(&json!("A")));
        assert_eq!(records[1].value("name"), Some(&json!("C")));
    }

    #[tokio::test]
    async fn modify_unknown_record_fails_commit() {
        let store = MemoryStore::new();
        let handle = store.handle("plot").await.unwrap();

        let mut tx = handle.begin("update").await.unwrap();
        tx.modify(
            &FeatureId::new("plot.9"),
            &[Property::new("name", json!("X"))],
        )
        .await
        .unwrap();
        let err = tx.commit().await.unwrap_err();
        tx.close().await.unwrap();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
