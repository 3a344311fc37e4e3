use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{MessId, RecordId, UserId};

/// Kind of completed mutation an audit record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransactionType {
    /// Wallet debited and coupons credited in one unit.
    SubscriptionPurchase,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionPurchase => "subscription_purchase",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription_purchase" => Ok(Self::SubscriptionPurchase),
            other => Err(TypeError::UnknownTransactionType(other.to_string())),
        }
    }
}

/// An audit entry as written by the ledger, before the store stamps it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mess_id: Option<MessId>,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub details: String,
}

impl NewRecord {
    /// Attach the store-assigned identity and commit timestamp.
    pub fn stamp(self, id: RecordId, timestamp: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id,
            user_id: self.user_id,
            mess_id: self.mess_id,
            amount: self.amount,
            kind: self.kind,
            timestamp,
            details: self.details,
        }
    }
}

/// Immutable, append-only audit entry for a completed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: RecordId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mess_id: Option<MessId>,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}
