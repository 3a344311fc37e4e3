use std::collections::{BTreeMap, HashMap};

use mess_types::{Account, MessId, NewRecord, UserId, Vendor};

use crate::error::{StoreError, StoreResult};
use crate::key::RecordKey;

/// State of one declared key as seen when a transaction began.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordSnapshot {
    Account(Option<Account>),
    Vendor(Option<Vendor>),
}

/// Handle passed to an optimistic transaction body.
///
/// Reads come from the snapshot taken when the transaction began (or from
/// writes already staged in this transaction). Writes are buffered and only
/// reach the store if the commit succeeds. Every key touched must have been
/// declared when the transaction was opened.
#[derive(Debug)]
pub struct Transaction {
    reads: HashMap<RecordKey, RecordSnapshot>,
    staged_accounts: BTreeMap<UserId, Account>,
    staged_records: Vec<NewRecord>,
}

/// Buffered writes of a finished transaction body, in staging order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionWrites {
    pub accounts: Vec<Account>,
    pub records: Vec<NewRecord>,
}

impl Transaction {
    /// Open a transaction over a snapshot of the declared keys.
    pub fn begin(reads: HashMap<RecordKey, RecordSnapshot>) -> Self {
        Self {
            reads,
            staged_accounts: BTreeMap::new(),
            staged_records: Vec::new(),
        }
    }

    /// Read an account, seeing this transaction's own staged write if any.
    ///
    /// Returns `Ok(None)` if the account did not exist at snapshot time.
    pub fn account(&self, user_id: &UserId) -> StoreResult<Option<&Account>> {
        if let Some(staged) = self.staged_accounts.get(user_id) {
            return Ok(Some(staged));
        }
        let key = RecordKey::account(user_id);
        match self.reads.get(&key) {
            Some(RecordSnapshot::Account(account)) => Ok(account.as_ref()),
            _ => Err(StoreError::UndeclaredKey(key)),
        }
    }

    /// Read a vendor record from the snapshot.
    pub fn vendor(&self, mess_id: &MessId) -> StoreResult<Option<&Vendor>> {
        let key = RecordKey::vendor(mess_id);
        match self.reads.get(&key) {
            Some(RecordSnapshot::Vendor(vendor)) => Ok(vendor.as_ref()),
            _ => Err(StoreError::UndeclaredKey(key)),
        }
    }

    /// Stage a full replacement of an existing, declared account.
    pub fn put_account(&mut self, account: Account) -> StoreResult<()> {
        let key = RecordKey::account(&account.user_id);
        match self.reads.get(&key) {
            Some(RecordSnapshot::Account(Some(_))) => {}
            Some(RecordSnapshot::Account(None)) => return Err(StoreError::NotFound(key)),
            _ => return Err(StoreError::UndeclaredKey(key)),
        }
        self.staged_accounts.insert(account.user_id.clone(), account);
        Ok(())
    }

    /// Stage a new audit record; the store assigns its id and timestamp at commit.
    pub fn create_record(&mut self, record: NewRecord) {
        self.staged_records.push(record);
    }

    pub fn has_writes(&self) -> bool {
        !self.staged_accounts.is_empty() || !self.staged_records.is_empty()
    }

    /// Consume the transaction and hand back its buffered writes.
    pub fn into_writes(self) -> TransactionWrites {
        TransactionWrites {
            accounts: self.staged_accounts.into_values().collect(),
            records: self.staged_records,
        }
    }
}
