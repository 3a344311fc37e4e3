//! Balance model: pure validation and arithmetic over wallets and coupon
//! counters. Nothing here touches the store.

use std::collections::BTreeMap;

use mess_types::{Account, MessId};

use crate::error::{LedgerError, LedgerResult};

/// Validate a credit/debit quantity: it must be present and strictly positive.
pub fn validate_credit(field: &str, amount: Option<i64>) -> LedgerResult<i64> {
    match amount {
        None => Err(LedgerError::invalid(format!(
            "missing required parameter: {field}"
        ))),
        Some(value) if value <= 0 => Err(LedgerError::invalid(format!(
            "{field} must be positive, got {value}"
        ))),
        Some(value) => Ok(value),
    }
}

/// Validate a quantity that may be zero but not negative or absent.
pub fn validate_count(field: &str, count: Option<i64>) -> LedgerResult<i64> {
    match count {
        None => Err(LedgerError::invalid(format!(
            "missing required parameter: {field}"
        ))),
        Some(value) if value < 0 => Err(LedgerError::invalid(format!(
            "{field} must not be negative, got {value}"
        ))),
        Some(value) => Ok(value),
    }
}

/// Return a copy of `counters` with `delta` added to the entry for `mess_id`.
///
/// Does not enforce non-negativity; callers check before committing.
pub fn apply_coupon_delta(
    counters: &BTreeMap<MessId, i64>,
    mess_id: &MessId,
    delta: i64,
) -> LedgerResult<BTreeMap<MessId, i64>> {
    let current = counters.get(mess_id).copied().unwrap_or(0);
    let updated = current
        .checked_add(delta)
        .ok_or_else(|| LedgerError::invalid(format!("coupon count for {mess_id} overflows")))?;
    let mut next = counters.clone();
    next.insert(mess_id.clone(), updated);
    Ok(next)
}

/// `wallet + delta`, rejecting overflow.
pub fn apply_wallet_delta(wallet: i64, delta: i64) -> LedgerResult<i64> {
    wallet
        .checked_add(delta)
        .ok_or_else(|| LedgerError::invalid("wallet balance overflows"))
}

/// Refuse to stage an account whose wallet or any coupon counter is negative.
pub fn ensure_non_negative(account: &Account) -> LedgerResult<()> {
    if account.wallet < 0 {
        return Err(LedgerError::precondition("Insufficient funds"));
    }
    if let Some((mess_id, _)) = account.coupons.iter().find(|(_, count)| **count < 0) {
        return Err(LedgerError::precondition(format!(
            "Insufficient coupons for {mess_id}"
        )));
    }
    Ok(())
}
