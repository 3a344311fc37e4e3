use std::fmt;
use std::path::PathBuf;

use mess_store::StoreError;

/// Stable classification of ledger failures, one per caller-visible outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Aborted,
    Internal,
}

impl ErrorKind {
    /// Wire code for RPC or CLI bindings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission-denied",
            Self::InvalidArgument => "invalid-argument",
            Self::NotFound => "not-found",
            Self::FailedPrecondition => "failed-precondition",
            Self::Aborted => "aborted",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors produced by ledger operations.
///
/// Raw store errors never escape the engine: an overflowing increment becomes
/// [`LedgerError::InvalidArgument`], anything else (a missing record
/// included) becomes [`LedgerError::Internal`] with the store error kept as
/// its source. `NotFound` is only raised by the engine's own existence checks.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("the operation must be called while authenticated")]
    Unauthenticated,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("transaction aborted after {attempts} conflicting attempts")]
    Aborted { attempts: u32 },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<StoreError>,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            Self::Aborted { .. } => ErrorKind::Aborted,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Overflow { key, field } => {
                Self::InvalidArgument(format!("{field} on {key} overflows"))
            }
            other => Self::Internal {
                message: format!("storage failure: {other}"),
                source: Some(other),
            },
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from loading or validating [`LedgerConfig`](crate::LedgerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use mess_store::{Field, RecordKey};
    use mess_types::UserId;
    use std::error::Error;

    #[test]
    fn store_not_found_is_internal_with_source() {
        let key = RecordKey::account(&UserId::new("u1").unwrap());
        let err = LedgerError::from(StoreError::NotFound(key));
        assert_eq!(err.kind(), ErrorKind::Internal);
        let source = err.source().expect("store error kept as source");
        assert_eq!(source.to_string(), "record not found: users/u1");
    }

    #[test]
    fn store_overflow_is_invalid_argument() {
        let err = LedgerError::from(StoreError::Overflow {
            key: RecordKey::account(&UserId::new("u1").unwrap()),
            field: Field::Wallet,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "invalid argument: wallet on users/u1 overflows");
    }

    #[test]
    fn other_store_errors_become_internal_with_source() {
        let err = LedgerError::from(StoreError::Unavailable("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        let source = err.source().expect("store error kept as source");
        assert_eq!(source.to_string(), "store unavailable: connection reset");
    }

    #[test]
    fn kinds_have_wire_codes() {
        assert_eq!(ErrorKind::FailedPrecondition.code(), "failed-precondition");
        assert_eq!(LedgerError::Unauthenticated.kind().to_string(), "unauthenticated");
        assert_eq!(LedgerError::Aborted { attempts: 5 }.kind(), ErrorKind::Aborted);
    }
}
