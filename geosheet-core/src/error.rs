//! Error types shared across the workspace.

use thiserror::Error;

use crate::attributes::AttributeKind;

/// Boxed error used to carry backend and driver causes.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for attribute extraction, coercion, and schema assembly.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// A required value was absent from the row
    #[error("missing value for attribute '{0}'")]
    Missing(String),

    /// A raw value could not be coerced into the attribute kind
    #[error("cannot convert value for attribute '{attribute}' to {expected}: {value}")]
    TypeConversion {
        /// Attribute whose value failed to convert
        attribute: String,
        /// Kind the value was expected to fit
        expected: AttributeKind,
        /// Offending raw value, rendered as JSON
        value: String,
    },

    /// An extraction rule failed for a rule-specific reason
    #[error("extraction error for attribute '{attribute}': {message}")]
    Extraction {
        /// Attribute whose rule failed
        attribute: String,
        /// Rule-specific failure description
        message: String,
    },

    /// Identity derivation failed
    #[error("cannot derive feature identity: {0}")]
    Identity(String),

    /// Attribute set construction failed
    #[error("invalid attribute set: {0}")]
    InvalidSet(String),
}

/// Result type for attribute operations.
pub type AttributeResult<T> = std::result::Result<T, AttributeError>;

/// Error type for feature-store access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A transaction failed to begin, do its work, or commit
    #[error("error persisting feature of type '{type_name}' during '{operation}'")]
    Transaction {
        /// Feature type the transaction addressed
        type_name: String,
        /// Operation label (`find`, `create`, `update`)
        operation: String,
        /// Underlying cause
        #[source]
        source: BoxedError,
    },

    /// A transaction failed to close after its work finished
    #[error("error closing '{operation}' transaction for feature type '{type_name}'")]
    CloseTransaction {
        /// Feature type the transaction addressed
        type_name: String,
        /// Operation label (`find`, `create`, `update`)
        operation: String,
        /// Underlying cause
        #[source]
        source: BoxedError,
    },

    /// More than one stored record matched one feature identifier
    #[error(
        "found {count} records of type '{type_name}' with identifier '{id}'; \
         feature identifiers must be unique"
    )]
    DuplicateIdentity {
        /// Feature type that was queried
        type_name: String,
        /// Identifier that matched more than once
        id: String,
        /// Number of matching records
        count: usize,
    },

    /// Raw backend or driver failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
