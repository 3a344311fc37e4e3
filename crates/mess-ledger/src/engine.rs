use std::sync::Arc;

use tracing::info;

use mess_store::{AccountStore, Field, RecordKey};
use mess_types::{Account, TransactionRecord, UserId};

use crate::audit::{self, AuditTrail};
use crate::authz::{policy_from_config, AuthorizationPolicy, SelfOnly};
use crate::balance::{apply_coupon_delta, apply_wallet_delta, ensure_non_negative};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::request::{
    Ack, Caller, CreditCouponsRequest, CreditWalletRequest, DebitReceipt, DebitWalletRequest,
    PurchaseSubscriptionRequest, RedeemCouponRequest,
};
use crate::retry::RetryPolicy;

/// The ledger engine: the only writer of wallet and coupon balances.
///
/// Every operation authenticates the caller, validates its request, checks
/// the authorization hook where one applies, and only then touches the
/// store. Pure credits use the store's native increment. Anything that must
/// read before it writes runs as an optimistic transaction that is retried on
/// conflict and always re-validated against freshly read state.
pub struct LedgerEngine<S> {
    store: S,
    policy: Arc<dyn AuthorizationPolicy>,
    retry: RetryPolicy,
}

impl<S: AccountStore> LedgerEngine<S> {
    pub fn new(store: S, policy: Arc<dyn AuthorizationPolicy>, retry: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            retry,
        }
    }

    /// Engine with the self-only policy and default retry bounds.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, Arc::new(SelfOnly), RetryPolicy::default())
    }

    pub fn from_config(store: S, config: &LedgerConfig) -> Self {
        Self::new(
            store,
            policy_from_config(&config.authorization),
            RetryPolicy::from_config(&config.retry),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- Mutations ----

    /// Add `count` coupons for a mess to a user's balance.
    pub fn credit_coupons(
        &self,
        caller: Option<&Caller>,
        request: &CreditCouponsRequest,
    ) -> LedgerResult<Ack> {
        let caller = authenticated(caller)?;
        let change = request.validate()?;
        if !self.policy.can_credit_coupons(caller, &change.user_id) {
            return Err(denied(caller, "credit coupons for", &change.user_id));
        }

        self.store.increment(
            &RecordKey::account(&change.user_id),
            &Field::Coupons(change.mess_id.clone()),
            change.count,
        )?;

        info!(
            caller = %caller.id,
            user = %change.user_id,
            mess = %change.mess_id,
            count = change.count,
            "coupons credited"
        );
        Ok(Ack::ok(format!(
            "Added {} coupons for mess {}",
            change.count, change.mess_id
        )))
    }

    /// Remove `count` coupons for a mess, refusing to go below zero.
    pub fn redeem_coupon(
        &self,
        caller: Option<&Caller>,
        request: &RedeemCouponRequest,
    ) -> LedgerResult<Ack> {
        let caller = authenticated(caller)?;
        let change = request.validate()?;
        if !self.policy.can_redeem_for(caller, &change.user_id) {
            return Err(denied(caller, "redeem coupons for", &change.user_id));
        }

        let keys = [RecordKey::account(&change.user_id)];
        let remaining = self.retry.run("redeem_coupon", |_| {
            self.store.run_atomic(&keys, |txn| -> LedgerResult<_> {
                let mut account = txn
                    .account(&change.user_id)?
                    .cloned()
                    .ok_or_else(user_not_found)?;

                let current = account.coupons_for(&change.mess_id);
                if current < change.count {
                    return Err(LedgerError::precondition("Insufficient coupons"));
                }

                account.coupons =
                    apply_coupon_delta(&account.coupons, &change.mess_id, -change.count)?;
                ensure_non_negative(&account)?;
                let remaining = account.coupons_for(&change.mess_id);
                txn.put_account(account)?;
                Ok(remaining)
            })
        })?;

        info!(
            caller = %caller.id,
            user = %change.user_id,
            mess = %change.mess_id,
            count = change.count,
            remaining,
            "coupons redeemed"
        );
        Ok(Ack::ok(format!("Redeemed {} coupons", change.count)))
    }

    /// Add `amount` to a user's wallet. Not idempotent: every call credits.
    pub fn credit_wallet(
        &self,
        caller: Option<&Caller>,
        request: &CreditWalletRequest,
    ) -> LedgerResult<Ack> {
        let caller = authenticated(caller)?;
        let change = request.validate()?;

        self.store.increment(
            &RecordKey::account(&change.user_id),
            &Field::Wallet,
            change.amount,
        )?;

        info!(
            caller = %caller.id,
            user = %change.user_id,
            amount = change.amount,
            "wallet credited"
        );
        Ok(Ack::ok(format!("Added {} to wallet", change.amount)))
    }

    /// Subtract `amount` from a user's wallet, refusing to overdraw.
    pub fn debit_wallet(
        &self,
        caller: Option<&Caller>,
        request: &DebitWalletRequest,
    ) -> LedgerResult<DebitReceipt> {
        let caller = authenticated(caller)?;
        let change = request.validate()?;

        let keys = [RecordKey::account(&change.user_id)];
        let new_balance = self.retry.run("debit_wallet", |_| {
            self.store.run_atomic(&keys, |txn| -> LedgerResult<_> {
                let mut account = txn
                    .account(&change.user_id)?
                    .cloned()
                    .ok_or_else(user_not_found)?;

                let new_balance = apply_wallet_delta(account.wallet, -change.amount)?;
                if new_balance < 0 {
                    return Err(LedgerError::precondition("Insufficient funds"));
                }

                account.wallet = new_balance;
                txn.put_account(account)?;
                Ok(new_balance)
            })
        })?;

        info!(
            caller = %caller.id,
            user = %change.user_id,
            amount = change.amount,
            new_balance,
            "wallet debited"
        );
        Ok(DebitReceipt {
            success: true,
            new_balance,
        })
    }

    /// Debit the plan price and credit the plan's coupons in one unit, with
    /// an audit record committed alongside.
    pub fn purchase_subscription(
        &self,
        caller: Option<&Caller>,
        request: &PurchaseSubscriptionRequest,
    ) -> LedgerResult<Ack> {
        let caller = authenticated(caller)?;
        let purchase = request.validate()?;

        let keys = [
            RecordKey::account(&purchase.user_id),
            RecordKey::vendor(&purchase.mess_id),
        ];
        let wallet = self.retry.run("purchase_subscription", |_| {
            self.store.run_atomic(&keys, |txn| -> LedgerResult<_> {
                let vendor_exists = txn.vendor(&purchase.mess_id)?.is_some();
                let account = txn.account(&purchase.user_id)?.cloned();
                let mut account = match account {
                    Some(account) if vendor_exists => account,
                    _ => return Err(LedgerError::NotFound("User or Mess not found".into())),
                };

                if account.wallet < purchase.plan_price {
                    return Err(LedgerError::precondition("Insufficient wallet balance"));
                }

                account.wallet = apply_wallet_delta(account.wallet, -purchase.plan_price)?;
                account.coupons =
                    apply_coupon_delta(&account.coupons, &purchase.mess_id, purchase.coupon_count)?;
                ensure_non_negative(&account)?;
                let wallet = account.wallet;

                txn.put_account(account)?;
                audit::record_in(txn, audit::subscription_purchase(&purchase));
                Ok(wallet)
            })
        })?;

        info!(
            caller = %caller.id,
            user = %purchase.user_id,
            mess = %purchase.mess_id,
            plan_price = purchase.plan_price,
            coupon_count = purchase.coupon_count,
            wallet,
            "subscription purchased"
        );
        Ok(Ack::ok("Subscription purchased successfully"))
    }

    // ---- Queries ----

    /// Current balances of a user.
    pub fn account(&self, caller: Option<&Caller>, user_id: &UserId) -> LedgerResult<Account> {
        let caller = authenticated(caller)?;
        if !self.policy.can_view(caller, user_id) {
            return Err(denied(caller, "view", user_id));
        }
        self.store.get_account(user_id)?.ok_or_else(user_not_found)
    }

    /// Audit records of a user, oldest first.
    pub fn audit_trail(
        &self,
        caller: Option<&Caller>,
        user_id: &UserId,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let caller = authenticated(caller)?;
        if !self.policy.can_view(caller, user_id) {
            return Err(denied(caller, "view", user_id));
        }
        AuditTrail::new(&self.store).entries(user_id)
    }
}

fn authenticated(caller: Option<&Caller>) -> LedgerResult<&Caller> {
    caller.ok_or(LedgerError::Unauthenticated)
}

fn denied(caller: &Caller, action: &str, user_id: &UserId) -> LedgerError {
    LedgerError::PermissionDenied(format!("{} may not {action} {user_id}", caller.id))
}

fn user_not_found() -> LedgerError {
    LedgerError::NotFound("User not found".into())
}
