use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the ledger engine.
///
/// Every section is optional in TOML; omitted values take their defaults.
///
/// ```toml
/// [retry]
/// max_attempts = 5
/// initial_backoff_ms = 5
/// max_backoff_ms = 100
///
/// [authorization]
/// coupon_issuers = ["mess_owner", "admin"]
/// redeemers = ["mess_staff"]
/// viewers = ["auditor"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub retry: RetryConfig,
    pub authorization: AuthorizationConfig,
}

/// Bounds on the optimistic-transaction retry loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first, before a transaction is aborted.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single backoff.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 5,
            max_backoff_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Roles that widen the default self-only authorization.
///
/// Empty lists mean only the account owner may act on their own account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Roles allowed to credit coupons to any user.
    pub coupon_issuers: Vec<String>,
    /// Roles allowed to redeem coupons on another user's behalf.
    pub redeemers: Vec<String>,
    /// Roles allowed to read any user's balances and audit trail.
    pub viewers: Vec<String>,
}

impl AuthorizationConfig {
    /// Returns `true` if no role widens the self-only default.
    pub fn is_self_only(&self) -> bool {
        self.coupon_issuers.is_empty() && self.redeemers.is_empty() && self.viewers.is_empty()
    }
}

impl LedgerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }
        let roles = self
            .authorization
            .coupon_issuers
            .iter()
            .chain(&self.authorization.redeemers)
            .chain(&self.authorization.viewers);
        for role in roles {
            if role.trim().is_empty() {
                return Err(ConfigError::Invalid("role names must not be blank".into()));
            }
        }
        Ok(())
    }
}
