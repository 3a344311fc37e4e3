//! Account storage boundary for the mess ledger.
//!
//! The ledger engine never talks to a database directly. It consumes the
//! [`AccountStore`] trait, which offers point reads, a single-attempt
//! optimistic transaction ([`AccountStore::run_atomic`]), a store-native
//! atomic increment, and append-only audit record creation.
//!
//! # Storage Backends
//!
//! - [`InMemoryAccountStore`] -- versioned `HashMap` store for tests, embedding,
//!   and the CLI's JSON state file
//!
//! # Design Rules
//!
//! 1. One account record per user, one vendor record per mess, one append-only
//!    collection of transaction records.
//! 2. `run_atomic` commits all staged writes iff none of the declared keys
//!    changed since the snapshot; otherwise it reports [`StoreError::Conflict`]
//!    and the caller decides whether to retry.
//! 3. `increment` commutes with other increments and needs no retry, but it
//!    does invalidate concurrent snapshots of the same account.
//! 4. Record ids and timestamps are assigned by the store, never the caller.
//! 5. The store does not enforce balance invariants -- that is the ledger's job.

pub mod error;
pub mod key;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use error::{StoreError, StoreResult};
pub use key::{Field, RecordKey};
pub use memory::{InMemoryAccountStore, StoreSnapshot};
pub use traits::AccountStore;
pub use transaction::{RecordSnapshot, Transaction, TransactionWrites};
