//! Errors raised by the reconciliation engine

use thiserror::Error;
use uuid::Uuid;

/// Engine error types
///
/// There is no "unclassifiable movement" error: the fallback rules make
/// classification total.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid quantity {quantity} on movement {movement_id:?}")]
    InvalidQuantity {
        movement_id: Option<Uuid>,
        quantity: String,
    },

    #[error("Movement {movement_id} belongs to scope '{found}', expected '{expected}'")]
    UnscopedMovement {
        movement_id: Uuid,
        expected: String,
        found: String,
    },

    #[error("Invalid report window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Quantity overflow while summing {context}")]
    QuantityOverflow { context: String },

    #[error("Pool count mismatch: expected {expected}, found {found}")]
    PoolCountMismatch { expected: usize, found: usize },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),
}

/// Result type alias for engine operations
pub type LedgerResult<T> = Result<T, LedgerError>;
