use crate::key::{Field, RecordKey};

/// Errors from account store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key read by an optimistic transaction was modified before commit.
    #[error("transaction conflict on {key}")]
    Conflict { key: RecordKey },

    /// The record an update targets does not exist.
    #[error("record not found: {0}")]
    NotFound(RecordKey),

    /// A transaction body touched a key it did not declare up front.
    #[error("key {0} was not declared for this transaction")]
    UndeclaredKey(RecordKey),

    /// The field does not exist on the addressed record.
    #[error("field {field} does not apply to {key}")]
    InvalidField { key: RecordKey, field: Field },

    /// A native increment would overflow the stored value.
    #[error("increment of {field} on {key} overflows")]
    Overflow { key: RecordKey, field: Field },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is unavailable (poisoned lock, lost connection).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` if the failure is an optimistic-concurrency conflict
    /// that a fresh attempt may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
