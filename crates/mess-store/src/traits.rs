use mess_types::{Account, MessId, NewRecord, TransactionRecord, UserId, Vendor};

use crate::error::StoreResult;
use crate::key::{Field, RecordKey};
use crate::transaction::Transaction;

/// Key-addressed account storage with an optimistic-transaction primitive.
///
/// All implementations must satisfy these invariants:
/// - `run_atomic` makes exactly one attempt. It snapshots the declared keys,
///   runs the body, and commits every staged write together iff no declared
///   key was modified since the snapshot. Otherwise nothing is written and
///   [`StoreError::Conflict`](crate::StoreError::Conflict) is returned.
/// - `increment` is atomic on its own and modifies the record as far as
///   concurrent snapshots are concerned.
/// - Transaction records are immutable; ids and timestamps are assigned by
///   the store and timestamps strictly increase in commit order.
pub trait AccountStore: Send + Sync {
    /// Point read of a user account. `Ok(None)` if it does not exist.
    fn get_account(&self, user_id: &UserId) -> StoreResult<Option<Account>>;

    /// Point read of a vendor record. `Ok(None)` if it does not exist.
    fn get_vendor(&self, mess_id: &MessId) -> StoreResult<Option<Vendor>>;

    /// Run one optimistic transaction attempt over `keys`.
    ///
    /// The outer `Result` reports store failures, including conflicts. The
    /// inner `Result` is whatever the body returned; when the body returns
    /// `Err`, its staged writes are discarded. A body failure observed on a
    /// snapshot that has since gone stale is reported as a conflict, so the
    /// caller re-evaluates against the latest state.
    fn run_atomic<T, E, F>(&self, keys: &[RecordKey], body: F) -> StoreResult<Result<T, E>>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>;

    /// Store-native atomic increment of a numeric account field.
    ///
    /// Fails with `NotFound` if the account does not exist.
    fn increment(&self, key: &RecordKey, field: &Field, delta: i64) -> StoreResult<()>;

    /// Append a standalone audit record outside any transaction.
    fn create_record(&self, record: NewRecord) -> StoreResult<TransactionRecord>;

    /// All audit records for a user, oldest first.
    fn records_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TransactionRecord>>;
}
