//! Foundation types for the mess ledger.
//!
//! This crate provides the identifiers and record shapes shared by the
//! store and the ledger engine. Every other crate in the workspace depends
//! on `mess-types`.
//!
//! # Key Types
//!
//! - [`UserId`] / [`MessId`] -- Opaque, non-blank identifiers for users and vendors
//! - [`Account`] -- A user's wallet scalar and per-vendor coupon counters
//! - [`Vendor`] -- A mess (vendor) record
//! - [`TransactionRecord`] -- Immutable audit entry with a store-assigned id and timestamp
//! - [`NewRecord`] -- An audit entry before the store has stamped it

pub mod account;
pub mod error;
pub mod id;
pub mod record;

pub use account::{Account, Vendor};
pub use error::TypeError;
pub use id::{MessId, RecordId, UserId};
pub use record::{NewRecord, TransactionRecord, TransactionType};
