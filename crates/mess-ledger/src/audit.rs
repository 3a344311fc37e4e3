//! Append-only audit trail of completed composite mutations.

use mess_store::{AccountStore, Transaction};
use mess_types::{NewRecord, TransactionRecord, TransactionType, UserId};

use crate::error::LedgerResult;
use crate::request::Purchase;

/// Reader and writer for a store's transaction records.
pub struct AuditTrail<'a, S> {
    store: &'a S,
}

impl<'a, S: AccountStore> AuditTrail<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Records for one user, oldest first.
    pub fn entries(&self, user_id: &UserId) -> LedgerResult<Vec<TransactionRecord>> {
        let mut records = self.store.records_for_user(user_id)?;
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

/// Stage a record inside an open transaction so it commits with the balance
/// changes it describes.
pub fn record_in(txn: &mut Transaction, record: NewRecord) {
    txn.create_record(record);
}

/// The record describing a subscription purchase.
pub fn subscription_purchase(purchase: &Purchase) -> NewRecord {
    NewRecord {
        user_id: purchase.user_id.clone(),
        mess_id: Some(purchase.mess_id.clone()),
        amount: purchase.plan_price,
        kind: TransactionType::SubscriptionPurchase,
        details: format!(
            "Purchased {} coupons for {}",
            purchase.coupon_count, purchase.mess_id
        ),
    }
}
