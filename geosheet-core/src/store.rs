//! Feature-store contract.
//!
//! The store itself is an external service. The pipeline consumes it
//! through this minimal surface: a [`FeatureStore`] yields per-feature-type
//! handles, a [`FeatureHandle`] opens short-lived labelled transactions,
//! and a [`StoreTransaction`] supports the four operations reconciliation
//! needs. Backends decide how types map to tables/layers and how values
//! are stored.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::feature::{Feature, FeatureId, Property};

/// A feature store holding typed feature records.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Handle addressing the records of one feature type.
    async fn handle(&self, type_name: &str) -> StoreResult<Box<dyn FeatureHandle>>;
}

/// Access to the records of one feature type.
#[async_trait]
pub trait FeatureHandle: Send + Sync {
    /// Feature type this handle addresses.
    fn type_name(&self) -> &str;

    /// Open a transaction labelled `operation`; the label shows up in
    /// error reports.
    async fn begin(&self, operation: &str) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// One short-lived store transaction.
///
/// Work is isolated until [`commit`](StoreTransaction::commit);
/// [`close`](StoreTransaction::close) must be called on every exit path
/// and discards work that was never committed.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Records of this handle's type matching `id` (zero or more).
    async fn query_by_id(&mut self, id: &FeatureId) -> StoreResult<Vec<Feature>>;

    /// Insert full feature records.
    async fn insert_many(&mut self, features: &[Feature]) -> StoreResult<()>;

    /// Modify the named properties of the record with identifier `id`.
    async fn modify(&mut self, id: &FeatureId, properties: &[Property]) -> StoreResult<()>;

    /// Make the transaction's work durable.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Release the transaction; uncommitted work is discarded.
    async fn close(&mut self) -> StoreResult<()>;
}
