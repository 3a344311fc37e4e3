use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mess_types::{Account, MessId, NewRecord, RecordId, TransactionRecord, UserId, Vendor};

use crate::error::{StoreError, StoreResult};
use crate::key::{Field, RecordKey};
use crate::traits::AccountStore;
use crate::transaction::{RecordSnapshot, Transaction};

/// In-memory account store with versioned records.
///
/// Every account and vendor carries a version that is bumped on each write.
/// Transaction bodies run without holding the lock; at commit the store
/// re-checks the versions of every declared key and rejects the commit with
/// [`StoreError::Conflict`] if any of them moved. This gives the same
/// first-committer-wins behaviour as a document database's optimistic
/// transactions.
pub struct InMemoryAccountStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    accounts: HashMap<UserId, Versioned<Account>>,
    vendors: HashMap<MessId, Versioned<Vendor>>,
    records: Vec<TransactionRecord>,
    last_timestamp: Option<DateTime<Utc>>,
}

struct Versioned<T> {
    version: u64,
    value: T,
}

/// Serializable image of the whole store, used for the CLI state file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl InMemoryAccountStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
        }
    }

    /// Rebuild a store from a snapshot. Record order is preserved.
    ///
    /// Rejects snapshots holding negative balances or repeated ids.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut state = StoreState::default();
        for account in snapshot.accounts {
            if !account.is_consistent() {
                return Err(StoreError::Serialization(format!(
                    "account {} has a negative balance",
                    account.user_id
                )));
            }
            let user_id = account.user_id.clone();
            let previous = state
                .accounts
                .insert(user_id.clone(), Versioned { version: 1, value: account });
            if previous.is_some() {
                return Err(StoreError::Serialization(format!(
                    "duplicate account {user_id}"
                )));
            }
        }
        for vendor in snapshot.vendors {
            let mess_id = vendor.mess_id.clone();
            let previous = state
                .vendors
                .insert(mess_id.clone(), Versioned { version: 1, value: vendor });
            if previous.is_some() {
                return Err(StoreError::Serialization(format!("duplicate mess {mess_id}")));
            }
        }
        let mut record_ids = HashSet::new();
        for record in &snapshot.transactions {
            if !record_ids.insert(record.id) {
                return Err(StoreError::Serialization(format!(
                    "duplicate transaction record {}",
                    record.id
                )));
            }
        }
        state.last_timestamp = snapshot.transactions.iter().map(|r| r.timestamp).max();
        state.records = snapshot.transactions;
        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    /// Load a JSON snapshot file. A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read(path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// Write the current contents to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let snapshot = self.snapshot()?;
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Capture the current contents, sorted by id for stable output.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let state = self.read_state()?;
        let mut accounts: Vec<Account> =
            state.accounts.values().map(|v| v.value.clone()).collect();
        accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let mut vendors: Vec<Vendor> = state.vendors.values().map(|v| v.value.clone()).collect();
        vendors.sort_by(|a, b| a.mess_id.cmp(&b.mess_id));
        Ok(StoreSnapshot {
            accounts,
            vendors,
            transactions: state.records.clone(),
        })
    }

    /// Create or replace an account record. Account creation happens outside
    /// the ledger; this is the hook that plays that role.
    pub fn insert_account(&self, account: Account) -> StoreResult<()> {
        let mut state = self.write_state()?;
        let version = state
            .accounts
            .get(&account.user_id)
            .map(|v| v.version + 1)
            .unwrap_or(1);
        state
            .accounts
            .insert(account.user_id.clone(), Versioned { version, value: account });
        Ok(())
    }

    /// Create or replace a vendor record.
    pub fn insert_vendor(&self, vendor: Vendor) -> StoreResult<()> {
        let mut state = self.write_state()?;
        let version = state
            .vendors
            .get(&vendor.mess_id)
            .map(|v| v.version + 1)
            .unwrap_or(1);
        state
            .vendors
            .insert(vendor.mess_id.clone(), Versioned { version, value: vendor });
        Ok(())
    }

    /// Total number of audit records.
    pub fn record_count(&self) -> StoreResult<usize> {
        Ok(self.read_state()?.records.len())
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("store read lock poisoned".into()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("store write lock poisoned".into()))
    }
}

impl StoreState {
    fn version_of(&self, key: &RecordKey) -> Option<u64> {
        match key {
            RecordKey::Account(id) => self.accounts.get(id).map(|v| v.version),
            RecordKey::Vendor(id) => self.vendors.get(id).map(|v| v.version),
        }
    }

    fn snapshot_of(&self, key: &RecordKey) -> RecordSnapshot {
        match key {
            RecordKey::Account(id) => {
                RecordSnapshot::Account(self.accounts.get(id).map(|v| v.value.clone()))
            }
            RecordKey::Vendor(id) => {
                RecordSnapshot::Vendor(self.vendors.get(id).map(|v| v.value.clone()))
            }
        }
    }

    /// First declared key whose version moved since the snapshot, if any.
    fn first_changed(&self, versions: &[(RecordKey, Option<u64>)]) -> Option<RecordKey> {
        versions
            .iter()
            .find(|(key, seen)| self.version_of(key) != *seen)
            .map(|(key, _)| key.clone())
    }

    /// Next commit timestamp, strictly after every previously assigned one.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamped);
        stamped
    }

    fn append_record(&mut self, record: NewRecord) -> TransactionRecord {
        let timestamp = self.next_timestamp();
        let stamped = record.stamp(RecordId::new(), timestamp);
        self.records.push(stamped.clone());
        stamped
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get_account(&self, user_id: &UserId) -> StoreResult<Option<Account>> {
        let state = self.read_state()?;
        Ok(state.accounts.get(user_id).map(|v| v.value.clone()))
    }

    fn get_vendor(&self, mess_id: &MessId) -> StoreResult<Option<Vendor>> {
        let state = self.read_state()?;
        Ok(state.vendors.get(mess_id).map(|v| v.value.clone()))
    }

    fn run_atomic<T, E, F>(&self, keys: &[RecordKey], body: F) -> StoreResult<Result<T, E>>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
    {
        let (reads, versions) = {
            let state = self.read_state()?;
            let reads: HashMap<RecordKey, RecordSnapshot> = keys
                .iter()
                .map(|key| (key.clone(), state.snapshot_of(key)))
                .collect();
            let versions: Vec<(RecordKey, Option<u64>)> = keys
                .iter()
                .map(|key| (key.clone(), state.version_of(key)))
                .collect();
            (reads, versions)
        };

        // The body runs unlocked; concurrent writers are detected at commit.
        let mut txn = Transaction::begin(reads);
        let outcome = body(&mut txn);

        let mut state = self.write_state()?;
        if let Some(key) = state.first_changed(&versions) {
            debug!(%key, "optimistic commit rejected");
            return Err(StoreError::Conflict { key });
        }

        let value = match outcome {
            Ok(value) => value,
            Err(e) => return Ok(Err(e)),
        };

        let writes = txn.into_writes();
        let (account_count, record_count) = (writes.accounts.len(), writes.records.len());
        for account in writes.accounts {
            let entry = state
                .accounts
                .get_mut(&account.user_id)
                .ok_or_else(|| StoreError::NotFound(RecordKey::account(&account.user_id)))?;
            entry.version += 1;
            entry.value = account;
        }
        for record in writes.records {
            state.append_record(record);
        }
        debug!(accounts = account_count, records = record_count, "transaction committed");

        Ok(Ok(value))
    }

    fn increment(&self, key: &RecordKey, field: &Field, delta: i64) -> StoreResult<()> {
        let RecordKey::Account(user_id) = key else {
            return Err(StoreError::InvalidField {
                key: key.clone(),
                field: field.clone(),
            });
        };

        let mut state = self.write_state()?;
        let entry = state
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let overflow = || StoreError::Overflow {
            key: key.clone(),
            field: field.clone(),
        };
        match field {
            Field::Wallet => {
                entry.value.wallet = entry.value.wallet.checked_add(delta).ok_or_else(overflow)?;
            }
            Field::Coupons(mess_id) => {
                let current = entry.value.coupons_for(mess_id);
                let updated = current.checked_add(delta).ok_or_else(overflow)?;
                entry.value.coupons.insert(mess_id.clone(), updated);
            }
        }
        entry.version += 1;
        Ok(())
    }

    fn create_record(&self, record: NewRecord) -> StoreResult<TransactionRecord> {
        let mut state = self.write_state()?;
        Ok(state.append_record(record))
    }

    fn records_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TransactionRecord>> {
        let state = self.read_state()?;
        Ok(state
            .records
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("InMemoryAccountStore");
        if let Ok(state) = self.inner.read() {
            out.field("accounts", &state.accounts.len())
                .field("vendors", &state.vendors.len())
                .field("records", &state.records.len());
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mess_types::TransactionType;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn mess(id: &str) -> MessId {
        MessId::new(id).unwrap()
    }

    fn seeded() -> InMemoryAccountStore {
        let store = InMemoryAccountStore::new();
        store
            .insert_account(Account::new(user("u1")).with_wallet(100))
            .unwrap();
        store.insert_vendor(Vendor::new(mess("m1"))).unwrap();
        store
    }

    fn purchase_record(user_id: &UserId) -> NewRecord {
        NewRecord {
            user_id: user_id.clone(),
            mess_id: Some(mess("m1")),
            amount: 40,
            kind: TransactionType::SubscriptionPurchase,
            details: "Purchased 10 coupons for m1".into(),
        }
    }

    // -----------------------------------------------------------------------
    // Point reads and increments
    // -----------------------------------------------------------------------

    #[test]
    fn point_reads_report_absence() {
        let store = seeded();
        assert_eq!(store.get_account(&user("u1")).unwrap().unwrap().wallet, 100);
        assert!(store.get_account(&user("nobody")).unwrap().is_none());
        assert!(store.get_vendor(&mess("m1")).unwrap().is_some());
        assert!(store.get_vendor(&mess("m2")).unwrap().is_none());
    }

    #[test]
    fn increment_updates_wallet_and_coupons() {
        let store = seeded();
        let key = RecordKey::account(&user("u1"));
        store.increment(&key, &Field::Wallet, 25).unwrap();
        store.increment(&key, &Field::Coupons(mess("m1")), 3).unwrap();
        store.increment(&key, &Field::Coupons(mess("m1")), 4).unwrap();

        let account = store.get_account(&user("u1")).unwrap().unwrap();
        assert_eq!(account.wallet, 125);
        assert_eq!(account.coupons_for(&mess("m1")), 7);
    }

    #[test]
    fn increment_missing_account_is_not_found() {
        let store = seeded();
        let err = store
            .increment(&RecordKey::account(&user("ghost")), &Field::Wallet, 1)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(RecordKey::Account(_))));
    }

    #[test]
    fn increment_rejects_vendor_keys_and_overflow() {
        let store = seeded();
        let err = store
            .increment(&RecordKey::vendor(&mess("m1")), &Field::Wallet, 1)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { .. }));

        let err = store
            .increment(&RecordKey::account(&user("u1")), &Field::Wallet, i64::MAX)
            .unwrap_err();
        assert!(matches!(err, StoreError::Overflow { .. }));
        assert_eq!(store.get_account(&user("u1")).unwrap().unwrap().wallet, 100);
    }

    // -----------------------------------------------------------------------
    // Optimistic transactions
    // -----------------------------------------------------------------------

    #[test]
    fn atomic_commit_applies_all_writes() {
        let store = seeded();
        let u = user("u1");
        let keys = [RecordKey::account(&u), RecordKey::vendor(&mess("m1"))];

        let result: Result<i64, StoreError> = store
            .run_atomic(&keys, |txn| {
                assert!(txn.vendor(&mess("m1"))?.is_some());
                let mut account = txn.account(&u)?.cloned().expect("seeded");
                account.wallet -= 40;
                account.coupons.insert(mess("m1"), 10);
                let wallet = account.wallet;
                txn.put_account(account)?;
                txn.create_record(purchase_record(&u));
                Ok(wallet)
            })
            .unwrap();

        assert_eq!(result.unwrap(), 60);
        let account = store.get_account(&u).unwrap().unwrap();
        assert_eq!(account.wallet, 60);
        assert_eq!(account.coupons_for(&mess("m1")), 10);
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn body_error_discards_writes() {
        let store = seeded();
        let u = user("u1");

        let result: Result<(), &str> = store
            .run_atomic(&[RecordKey::account(&u)], |txn| {
                txn.put_account(Account::new(u.clone()).with_wallet(0)).unwrap();
                txn.create_record(purchase_record(&u));
                Err("insufficient")
            })
            .unwrap();

        assert_eq!(result.unwrap_err(), "insufficient");
        assert_eq!(store.get_account(&u).unwrap().unwrap().wallet, 100);
        assert_eq!(store.record_count().unwrap(), 0);
    }

    #[test]
    fn concurrent_increment_causes_conflict() {
        let store = seeded();
        let u = user("u1");
        let key = RecordKey::account(&u);

        let err = store
            .run_atomic(&[key.clone()], |txn| {
                let mut account = txn.account(&u)?.cloned().expect("seeded");
                // Another writer lands between snapshot and commit.
                store.increment(&key, &Field::Wallet, 5)?;
                account.wallet -= 100;
                txn.put_account(account)?;
                Ok::<_, StoreError>(())
            })
            .unwrap_err();

        assert!(err.is_conflict());
        // Only the increment landed.
        assert_eq!(store.get_account(&u).unwrap().unwrap().wallet, 105);
    }

    #[test]
    fn stale_body_failure_is_reported_as_conflict() {
        let store = seeded();
        let u = user("u1");
        let key = RecordKey::account(&u);

        let err = store
            .run_atomic(&[key.clone()], |_txn| {
                store.increment(&key, &Field::Wallet, 1).unwrap();
                Err::<(), _>("precondition failed on stale data")
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn creation_of_declared_missing_key_conflicts() {
        let store = seeded();
        let ghost = user("ghost");
        let key = RecordKey::account(&ghost);

        let err = store
            .run_atomic(&[key], |txn| {
                assert!(txn.account(&ghost)?.is_none());
                store.insert_account(Account::new(ghost.clone()))?;
                Ok::<_, StoreError>(())
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }

    // -----------------------------------------------------------------------
    // Audit records
    // -----------------------------------------------------------------------

    #[test]
    fn record_timestamps_strictly_increase() {
        let store = seeded();
        let u = user("u1");
        let stamped: Vec<TransactionRecord> = (0..50)
            .map(|_| store.create_record(purchase_record(&u)).unwrap())
            .collect();

        for pair in stamped.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
            assert_ne!(pair[1].id, pair[0].id);
        }
    }

    #[test]
    fn records_are_filtered_by_user() {
        let store = seeded();
        store
            .insert_account(Account::new(user("u2")))
            .unwrap();
        store.create_record(purchase_record(&user("u1"))).unwrap();
        store.create_record(purchase_record(&user("u2"))).unwrap();
        store.create_record(purchase_record(&user("u1"))).unwrap();

        let records = store.records_for_user(&user("u1")).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.user_id == user("u1")));
        assert!(records[0].timestamp < records[1].timestamp);
    }

    // -----------------------------------------------------------------------
    // Snapshot persistence
    // -----------------------------------------------------------------------

    #[test]
    fn save_and_load_preserve_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = seeded();
        store.create_record(purchase_record(&user("u1"))).unwrap();
        store.save(&path).unwrap();

        let loaded = InMemoryAccountStore::load(&path).unwrap();
        assert_eq!(loaded.snapshot().unwrap(), store.snapshot().unwrap());

        // Timestamps keep increasing across a reload.
        let before = loaded.records_for_user(&user("u1")).unwrap()[0].timestamp;
        let after = loaded.create_record(purchase_record(&user("u1"))).unwrap();
        assert!(after.timestamp > before);
    }

    #[test]
    fn loading_missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryAccountStore::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store.snapshot().unwrap(), StoreSnapshot::default());
    }

    #[test]
    fn snapshot_with_negative_balance_is_rejected() {
        let snapshot = StoreSnapshot {
            accounts: vec![Account::new(user("u1")).with_wallet(-1)],
            ..StoreSnapshot::default()
        };
        let err = InMemoryAccountStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));

        let snapshot = StoreSnapshot {
            accounts: vec![Account::new(user("u1")).with_coupons(mess("m1"), -3)],
            ..StoreSnapshot::default()
        };
        assert!(InMemoryAccountStore::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn snapshot_with_repeated_ids_is_rejected() {
        let snapshot = StoreSnapshot {
            accounts: vec![
                Account::new(user("u1")).with_wallet(10),
                Account::new(user("u1")).with_wallet(20),
            ],
            ..StoreSnapshot::default()
        };
        let err = InMemoryAccountStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(ref m) if m.contains("u1")));

        let snapshot = StoreSnapshot {
            vendors: vec![Vendor::new(mess("m1")), Vendor::new(mess("m1"))],
            ..StoreSnapshot::default()
        };
        assert!(InMemoryAccountStore::from_snapshot(snapshot).is_err());

        let record = purchase_record(&user("u1")).stamp(RecordId::new(), Utc::now());
        let snapshot = StoreSnapshot {
            transactions: vec![record.clone(), record],
            ..StoreSnapshot::default()
        };
        assert!(InMemoryAccountStore::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn load_rejects_inconsistent_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"accounts":[{"userId":"u1","wallet":-5}]}"#).unwrap();
        let err = InMemoryAccountStore::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
