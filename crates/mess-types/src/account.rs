use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{MessId, UserId};

/// A user's balances: one wallet scalar and one coupon counter per mess.
///
/// `wallet` is held in minor currency units. Both the wallet and every coupon
/// counter must stay non-negative; a missing coupon entry counts as zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: UserId,
    #[serde(default)]
    pub wallet: i64,
    #[serde(default)]
    pub coupons: BTreeMap<MessId, i64>,
}

impl Account {
    /// An empty account: zero wallet, no coupons.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            wallet: 0,
            coupons: BTreeMap::new(),
        }
    }

    pub fn with_wallet(mut self, wallet: i64) -> Self {
        self.wallet = wallet;
        self
    }

    pub fn with_coupons(mut self, mess_id: MessId, count: i64) -> Self {
        self.coupons.insert(mess_id, count);
        self
    }

    /// Coupon count for a mess, treating an absent entry as zero.
    pub fn coupons_for(&self, mess_id: &MessId) -> i64 {
        self.coupons.get(mess_id).copied().unwrap_or(0)
    }

    /// Returns `true` if the wallet and every coupon counter are non-negative.
    pub fn is_consistent(&self) -> bool {
        self.wallet >= 0 && self.coupons.values().all(|count| *count >= 0)
    }
}

/// A mess (vendor) record. Only its existence matters to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub mess_id: MessId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Vendor {
    pub fn new(mess_id: MessId) -> Self {
        Self { mess_id, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
