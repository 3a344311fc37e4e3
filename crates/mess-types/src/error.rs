use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{kind} must not be blank")]
    BlankIdentifier { kind: &'static str },

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("unknown transaction type: {0}")]
    UnknownTransactionType(String),
}
