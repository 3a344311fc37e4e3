//! Ledger engine for the mess ledger.
//!
//! This crate is the only writer of wallet and coupon balances. It provides:
//! - Typed requests with validation that runs before any store access
//! - [`LedgerEngine`] with the five mutating operations and two queries
//! - Optimistic transactions with bounded, jittered retry ([`RetryPolicy`])
//! - A pluggable [`AuthorizationPolicy`] hook, self-only by default
//! - The append-only audit trail of subscription purchases
//! - TOML configuration ([`LedgerConfig`])
//!
//! ```
//! use mess_ledger::{Caller, DebitWalletRequest, LedgerEngine};
//! use mess_store::InMemoryAccountStore;
//! use mess_types::{Account, UserId};
//!
//! let store = InMemoryAccountStore::new();
//! let user = UserId::new("u1").unwrap();
//! store.insert_account(Account::new(user.clone()).with_wallet(100)).unwrap();
//!
//! let engine = LedgerEngine::with_defaults(store);
//! let caller = Caller::new(user);
//! let receipt = engine
//!     .debit_wallet(Some(&caller), &DebitWalletRequest::new("u1", 40))
//!     .unwrap();
//! assert_eq!(receipt.new_balance, 60);
//! ```

pub mod audit;
pub mod authz;
pub mod balance;
pub mod config;
pub mod engine;
pub mod error;
pub mod request;
pub mod retry;

#[cfg(test)]
mod testkit;

pub use audit::AuditTrail;
pub use authz::{policy_from_config, AuthorizationPolicy, RolePolicy, SelfOnly};
pub use config::{AuthorizationConfig, LedgerConfig, RetryConfig};
pub use engine::LedgerEngine;
pub use error::{ConfigError, ErrorKind, LedgerError, LedgerResult};
pub use request::{
    from_json, Ack, Caller, CouponChange, CreditCouponsRequest, CreditWalletRequest,
    DebitReceipt, DebitWalletRequest, Purchase, PurchaseSubscriptionRequest, RedeemCouponRequest,
    WalletChange,
};
pub use retry::RetryPolicy;
