//! Typed inputs and outputs of the ledger's call surface.
//!
//! Requests mirror the loosely-typed payloads a client sends: every field is
//! optional so that a missing field is reported as `InvalidArgument` rather
//! than a decode failure, and unknown fields are rejected. `validate()` turns
//! a request into its checked form before the engine touches the store.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use mess_types::{MessId, UserId};

use crate::balance::{validate_count, validate_credit};
use crate::error::{LedgerError, LedgerResult};

/// An authenticated principal invoking the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub roles: BTreeSet<String>,
}

impl Caller {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn is(&self, user_id: &UserId) -> bool {
        &self.id == user_id
    }

    /// Returns `true` if the caller holds any of `roles`.
    pub fn has_any_role(&self, roles: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

/// Decode a request from an untyped JSON payload.
///
/// Wrong types, unknown fields, and malformed payloads all surface as
/// `InvalidArgument`.
pub fn from_json<T: DeserializeOwned>(payload: serde_json::Value) -> LedgerResult<T> {
    serde_json::from_value(payload).map_err(|e| LedgerError::invalid(e.to_string()))
}

fn require_user(field: &str, value: &Option<String>) -> LedgerResult<UserId> {
    let raw = value
        .as_deref()
        .ok_or_else(|| LedgerError::invalid(format!("missing required parameter: {field}")))?;
    UserId::new(raw).map_err(|e| LedgerError::invalid(e.to_string()))
}

fn require_mess(field: &str, value: &Option<String>) -> LedgerResult<MessId> {
    let raw = value
        .as_deref()
        .ok_or_else(|| LedgerError::invalid(format!("missing required parameter: {field}")))?;
    MessId::new(raw).map_err(|e| LedgerError::invalid(e.to_string()))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Input of `CreditCoupons`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreditCouponsRequest {
    pub user_id: Option<String>,
    pub mess_id: Option<String>,
    pub count: Option<i64>,
}

/// Input of `RedeemCoupon`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedeemCouponRequest {
    pub user_id: Option<String>,
    pub mess_id: Option<String>,
    pub count: Option<i64>,
}

/// Input of `CreditWallet`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreditWalletRequest {
    pub user_id: Option<String>,
    pub amount: Option<i64>,
}

/// Input of `DebitWallet`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DebitWalletRequest {
    pub user_id: Option<String>,
    pub amount: Option<i64>,
}

/// Input of `PurchaseSubscription`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PurchaseSubscriptionRequest {
    pub user_id: Option<String>,
    pub mess_id: Option<String>,
    pub plan_price: Option<i64>,
    pub coupon_count: Option<i64>,
}

impl CreditCouponsRequest {
    pub fn new(user_id: &str, mess_id: &str, count: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            mess_id: Some(mess_id.into()),
            count: Some(count),
        }
    }

    pub fn validate(&self) -> LedgerResult<CouponChange> {
        Ok(CouponChange {
            user_id: require_user("userId", &self.user_id)?,
            mess_id: require_mess("messId", &self.mess_id)?,
            count: validate_credit("count", self.count)?,
        })
    }
}

impl RedeemCouponRequest {
    pub fn new(user_id: &str, mess_id: &str, count: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            mess_id: Some(mess_id.into()),
            count: Some(count),
        }
    }

    pub fn validate(&self) -> LedgerResult<CouponChange> {
        Ok(CouponChange {
            user_id: require_user("userId", &self.user_id)?,
            mess_id: require_mess("messId", &self.mess_id)?,
            count: validate_credit("count", self.count)?,
        })
    }
}

impl CreditWalletRequest {
    pub fn new(user_id: &str, amount: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            amount: Some(amount),
        }
    }

    pub fn validate(&self) -> LedgerResult<WalletChange> {
        Ok(WalletChange {
            user_id: require_user("userId", &self.user_id)?,
            amount: validate_credit("amount", self.amount)?,
        })
    }
}

impl DebitWalletRequest {
    pub fn new(user_id: &str, amount: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            amount: Some(amount),
        }
    }

    pub fn validate(&self) -> LedgerResult<WalletChange> {
        Ok(WalletChange {
            user_id: require_user("userId", &self.user_id)?,
            amount: validate_credit("amount", self.amount)?,
        })
    }
}

impl PurchaseSubscriptionRequest {
    pub fn new(user_id: &str, mess_id: &str, plan_price: i64, coupon_count: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            mess_id: Some(mess_id.into()),
            plan_price: Some(plan_price),
            coupon_count: Some(coupon_count),
        }
    }

    pub fn validate(&self) -> LedgerResult<Purchase> {
        Ok(Purchase {
            user_id: require_user("userId", &self.user_id)?,
            mess_id: require_mess("messId", &self.mess_id)?,
            plan_price: validate_credit("planPrice", self.plan_price)?,
            coupon_count: validate_count("couponCount", self.coupon_count)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Validated forms
// ---------------------------------------------------------------------------

/// A checked coupon credit or redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponChange {
    pub user_id: UserId,
    pub mess_id: MessId,
    pub count: i64,
}

/// A checked wallet credit or debit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletChange {
    pub user_id: UserId,
    pub amount: i64,
}

/// A checked subscription purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    pub user_id: UserId,
    pub mess_id: MessId,
    pub plan_price: i64,
    pub coupon_count: i64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Success payload carrying a human-readable confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Success payload of `DebitWallet`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitReceipt {
    pub success: bool,
    pub new_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn decodes_camel_case_payload() {
        let req: PurchaseSubscriptionRequest = from_json(json!({
            "userId": "u1",
            "messId": "m1",
            "planPrice": 50,
            "couponCount": 20,
        }))
        .unwrap();
        assert_eq!(req, PurchaseSubscriptionRequest::new("u1", "m1", 50, 20));
    }

    #[test]
    fn unknown_fields_are_invalid_arguments() {
        let err = from_json::<CreditWalletRequest>(json!({
            "userId": "u1",
            "amount": 10,
            "currency": "INR",
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn non_numeric_amounts_are_invalid_arguments() {
        for amount in [json!("ten"), json!(2.5), json!(true)] {
            let err = from_json::<DebitWalletRequest>(json!({ "userId": "u1", "amount": amount }))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn missing_fields_fail_validation() {
        let req: RedeemCouponRequest = from_json(json!({ "userId": "u1", "count": 2 })).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("messId"));

        let err = CreditCouponsRequest::default().validate().unwrap_err();
        assert!(err.to_string().contains("userId"));
    }

    #[test]
    fn blank_ids_fail_validation() {
        let err = CreditWalletRequest::new("  ", 10).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn purchase_allows_zero_coupons_but_not_zero_price() {
        assert!(PurchaseSubscriptionRequest::new("u1", "m1", 50, 0)
            .validate()
            .is_ok());
        let err = PurchaseSubscriptionRequest::new("u1", "m1", 0, 5)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("planPrice"));
    }

    #[test]
    fn debit_receipt_uses_new_balance_key() {
        let json = serde_json::to_value(DebitReceipt {
            success: true,
            new_balance: 0,
        })
        .unwrap();
        assert_eq!(json, json!({ "success": true, "newBalance": 0 }));
    }

    #[test]
    fn caller_roles() {
        let caller = Caller::new(UserId::new("staff-1").unwrap()).with_role("mess_staff");
        let wanted = BTreeSet::from(["mess_staff".to_string()]);
        assert!(caller.has_any_role(&wanted));
        assert!(!caller.has_any_role(&BTreeSet::new()));
        assert!(caller.is(&UserId::new("staff-1").unwrap()));
    }
}
