//! Feature reconciliation against the store.
//!
//! Each operation runs in its own short-lived transaction — find, then
//! create or update, never one transaction spanning several features —
//! which bounds lock duration and isolates partial failures to a single
//! row's write. Retry policy, if any, belongs to the caller.

use tracing::debug;

use geosheet_core::error::{StoreError, StoreResult};
use geosheet_core::feature::{Feature, Property};
use geosheet_core::store::{FeatureStore, StoreTransaction};

/// Reconcile `feature` against the store: insert it when absent,
/// otherwise modify only the properties that actually changed.
///
/// # Errors
///
/// Propagates find/create/update failures, including the fatal
/// [`StoreError::DuplicateIdentity`] consistency error.
pub async fn persist(store: &dyn FeatureStore, feature: &Feature) -> StoreResult<()> {
    match find(store, feature).await? {
        None => create(store, feature).await,
        Some(existing) => update(store, feature, &existing).await,
    }
}

/// Look up the stored record matching `feature`'s identifier.
///
/// # Errors
///
/// At most one match may exist; more than one means duplicate identity in
/// the store and returns [`StoreError::DuplicateIdentity`] rather than
/// silently picking one.
pub async fn find(store: &dyn FeatureStore, feature: &Feature) -> StoreResult<Option<Feature>> {
    let handle = store.handle(feature.type_name()).await?;
    let mut tx = handle
        .begin("find")
        .await
        .map_err(|e| transaction_error(feature.type_name(), "find", e))?;
    let work = tx.query_by_id(feature.id()).await;
    let matches = finish(tx, feature.type_name(), "find", work).await?;

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.into_iter().next()),
        count => Err(StoreError::DuplicateIdentity {
            type_name: feature.type_name().to_string(),
            id: feature.id().to_string(),
            count,
        }),
    }
}

/// Insert the full feature as a new record in one transaction.
///
/// # Errors
///
/// Returns a persistence error naming the feature type and operation.
pub async fn create(store: &dyn FeatureStore, feature: &Feature) -> StoreResult<()> {
    debug!(feature = %feature.id(), "creating feature");
    let handle = store.handle(feature.type_name()).await?;
    let mut tx = handle
        .begin("create")
        .await
        .map_err(|e| transaction_error(feature.type_name(), "create", e))?;
    let work = tx.insert_many(std::slice::from_ref(feature)).await;
    finish(tx, feature.type_name(), "create", work).await
}

/// Modify the properties of `feature` that differ from `existing`.
///
/// Sentinel properties and properties whose stored value already matches
/// are dropped; when nothing remains the store is not touched at all — no
/// transaction is even opened.
///
/// # Errors
///
/// Returns a persistence error naming the feature type and operation.
pub async fn update(
    store: &dyn FeatureStore,
    feature: &Feature,
    existing: &Feature,
) -> StoreResult<()> {
    let changed = changed_properties(feature, existing);
    if changed.is_empty() {
        debug!(feature = %feature.id(), "feature unchanged, skipping update");
        return Ok(());
    }

    debug!(feature = %feature.id(), properties = changed.len(), "updating feature");
    let handle = store.handle(feature.type_name()).await?;
    let mut tx = handle
        .begin("update")
        .await
        .map_err(|e| transaction_error(feature.type_name(), "update", e))?;
    let work = tx.modify(feature.id(), &changed).await;
    finish(tx, feature.type_name(), "update", work).await
}

/// Non-sentinel properties of `feature` whose value differs from the
/// stored record.
fn changed_properties(feature: &Feature, existing: &Feature) -> Vec<Property> {
    feature
        .properties()
        .iter()
        .filter(|p| !p.is_sentinel())
        .filter(|p| existing.value(&p.name) != Some(&p.value))
        .cloned()
        .collect()
}

/// Commit `work` if it succeeded and close the transaction on every exit
/// path. Close failures are reported even when the commit went through.
async fn finish<T>(
    mut tx: Box<dyn StoreTransaction>,
    type_name: &str,
    operation: &str,
    work: StoreResult<T>,
) -> StoreResult<T> {
    let outcome = match work {
        Ok(value) => match tx.commit().await {
            Ok(()) => Ok(value),
            Err(e) => Err(transaction_error(type_name, operation, e)),
        },
        Err(e) => Err(transaction_error(type_name, operation, e)),
    };
    match tx.close().await {
        Ok(()) => outcome,
        Err(e) => Err(StoreError::CloseTransaction {
            type_name: type_name.to_string(),
            operation: operation.to_string(),
            source: Box::new(e),
        }),
    }
}

fn transaction_error(type_name: &str, operation: &str, source: StoreError) -> StoreError {
    StoreError::Transaction {
        type_name: type_name.to_string(),
        operation: operation.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{JournalEntry, MemoryStore};
    use async_trait::async_trait;
    use geosheet_core::feature::FeatureId;
    use geosheet_core::store::FeatureHandle;
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
    async fn persist_creates_then_updates_minimally() {
        let store = MemoryStore::new();

        persist(&store, &plot("plot.1", "A")).await.unwrap();
        persist(&store, &plot("plot.1", "A")).await.unwrap();

        // Second persist found the record unchanged: one insert, no modify.
        assert_eq!(
            store.journal(),
            vec![JournalEntry::Insert {
                type_name: "plot".to_string(),
                count: 1
            }]
        );

        persist(&store, &plot("plot.1", "B")).await.unwrap();
        assert_eq!(
            store.journal().last(),
            Some(&JournalEntry::Modify {
                type_name: "plot".to_string(),
                id: "plot.1".to_string(),
                properties: vec!["name".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn duplicate_identity_aborts_without_writing() {
        let store = MemoryStore::new();
        store.seed(plot("plot.1", "A"));
        store.seed(plot("plot.1", "B"));

        let err = persist(&store, &plot("plot.1", "C")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateIdentity { count: 2, .. }
        ));
        assert_eq!(store.journal(), Vec::new());
    }

    #[tokio::test]
    async fn sentinel_properties_never_reach_the_store() {
        let store = MemoryStore::new();
        store.seed(plot("plot.1", "A"));

        let mut feature = plot("plot.1", "B");
        feature.push_property(Property::sentinel());
        let existing = find(&store, &feature).await.unwrap().expect("seeded");
        update(&store, &feature, &existing).await.unwrap();

        assert_eq!(
            store.journal(),
            vec![JournalEntry::Modify {
                type_name: "plot".to_string(),
                id: "plot.1".to_string(),
                properties: vec!["name".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn empty_update_opens_no_transaction() {
        let store = MemoryStore::new();
        store.seed(plot("plot.1", "A"));

        let feature = plot("plot.1", "A");
        let existing = find(&store, &feature).await.unwrap().expect("seeded");
        store.clear_journal();
        update(&store, &feature, &existing).await.unwrap();
        assert_eq!(store.journal(), Vec::new());
    }

    /// Store whose transactions fail on close, after commit succeeded.
    struct LeakyStore {
        inner: MemoryStore,
    }

    struct LeakyHandle {
        inner: Box<dyn FeatureHandle>,
    }

    struct LeakyTransaction {
        inner: Box<dyn StoreTransaction>,
    }

    #[async_trait]
    impl FeatureStore for LeakyStore {
        async fn handle(&self, type_name: &str) -> StoreResult<Box<dyn FeatureHandle>> {
            Ok(Box::new(LeakyHandle {
                inner: self.inner.handle(type_name).await?,
            }))
        }
    }

    #[async_trait]
    impl FeatureHandle for LeakyHandle {
        fn type_name(&self) -> &str {
            self.inner.type_name()
        }

        async fn begin(&self, operation: &str) -> StoreResult<Box<dyn StoreTransaction>> {
            Ok(Box::new(LeakyTransaction {
                inner: self.inner.begin(operation).await?,
            }))
        }
    }

    #[async_trait]
    impl StoreTransaction for LeakyTransaction {
        async fn query_by_id(&mut self, id: &FeatureId) -> StoreResult<Vec<Feature>> {
            self.inner.query_by_id(id).await
        }

        async fn insert_many(&mut self, features: &[Feature]) -> StoreResult<()> {
            self.inner.insert_many(features).await
        }

        async fn modify(&mut self, id: &FeatureId, properties: &[Property]) -> StoreResult<()> {
            self.inner.modify(id, properties).await
        }

        async fn commit(&mut self) -> StoreResult<()> {
            self.inner.commit().await
        }

        async fn close(&mut self) -> StoreResult<()> {
            Err(StoreError::Backend("connection already gone".to_string()))
        }
    }

    #[tokio::test]
    async fn close_failure_is_reported_even_after_commit() {
        let store = LeakyStore {
            inner: MemoryStore::new(),
        };

        let err = create(&store, &plot("plot.1", "A")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::CloseTransaction { ref operation, .. } if operation == "create"
        ));
        // The commit itself went through before close failed.
        assert_eq!(store.inner.records("plot").len(), 1);
    }
}
