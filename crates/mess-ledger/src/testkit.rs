//! Test helpers: seeded stores and instrumented store wrappers.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use mess_store::{
    AccountStore, Field, InMemoryAccountStore, RecordKey, StoreError, StoreResult, Transaction,
};
use mess_types::{Account, MessId, NewRecord, TransactionRecord, UserId, Vendor};

use crate::request::Caller;

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn mess(id: &str) -> MessId {
    MessId::new(id).unwrap()
}

pub fn caller(id: &str) -> Caller {
    Caller::new(user(id))
}

/// Store holding account `u1` with the given balances and vendor `m1`.
pub fn seeded_store(wallet: i64, coupons: &[(&str, i64)]) -> InMemoryAccountStore {
    let store = InMemoryAccountStore::new();
    let mut account = Account::new(user("u1")).with_wallet(wallet);
    for (mess_id, count) in coupons {
        account = account.with_coupons(mess(mess_id), *count);
    }
    store.insert_account(account).unwrap();
    store.insert_vendor(Vendor::new(mess("m1"))).unwrap();
    store
}

/// Counts every call that reaches the store.
pub struct CountingStore {
    inner: InMemoryAccountStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryAccountStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl AccountStore for CountingStore {
    fn get_account(&self, user_id: &UserId) -> StoreResult<Option<Account>> {
        self.hit();
        self.inner.get_account(user_id)
    }

    fn get_vendor(&self, mess_id: &MessId) -> StoreResult<Option<Vendor>> {
        self.hit();
        self.inner.get_vendor(mess_id)
    }

    fn run_atomic<T, E, F>(&self, keys: &[RecordKey], body: F) -> StoreResult<Result<T, E>>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
    {
        self.hit();
        self.inner.run_atomic(keys, body)
    }

    fn increment(&self, key: &RecordKey, field: &Field, delta: i64) -> StoreResult<()> {
        self.hit();
        self.inner.increment(key, field, delta)
    }

    fn create_record(&self, record: NewRecord) -> StoreResult<TransactionRecord> {
        self.hit();
        self.inner.create_record(record)
    }

    fn records_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TransactionRecord>> {
        self.hit();
        self.inner.records_for_user(user_id)
    }
}

/// Rejects the first `conflicts` transaction attempts as if another writer
/// had committed first, then behaves like the wrapped store.
pub struct ConflictingStore {
    inner: InMemoryAccountStore,
    remaining: AtomicU32,
    attempts: AtomicU32,
}

impl ConflictingStore {
    pub fn new(inner: InMemoryAccountStore, conflicts: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryAccountStore {
        &self.inner
    }
}

impl AccountStore for ConflictingStore {
    fn get_account(&self, user_id: &UserId) -> StoreResult<Option<Account>> {
        self.inner.get_account(user_id)
    }

    fn get_vendor(&self, mess_id: &MessId) -> StoreResult<Option<Vendor>> {
        self.inner.get_vendor(mess_id)
    }

    fn run_atomic<T, E, F>(&self, keys: &[RecordKey], body: F) -> StoreResult<Result<T, E>>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
    {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let forced = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(StoreError::Conflict {
                key: keys[0].clone(),
            });
        }
        self.inner.run_atomic(keys, body)
    }

    fn increment(&self, key: &RecordKey, field: &Field, delta: i64) -> StoreResult<()> {
        self.inner.increment(key, field, delta)
    }

    fn create_record(&self, record: NewRecord) -> StoreResult<TransactionRecord> {
        self.inner.create_record(record)
    }

    fn records_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TransactionRecord>> {
        self.inner.records_for_user(user_id)
    }
}
