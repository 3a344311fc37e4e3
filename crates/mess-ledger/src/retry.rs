//! Transaction control for optimistic read-validate-write cycles.
//!
//! Each attempt ends in one of three states:
//! - **Committed**: the body succeeded and the store accepted the writes.
//! - **Aborted**: the body rejected the operation (not found, insufficient
//!   balance). Final; never retried.
//! - **Conflict**: a declared key changed before commit. The whole body is
//!   run again against fresh state after a short backoff, until the attempt
//!   budget runs out.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use mess_store::StoreResult;

use crate::config::RetryConfig;
use crate::error::{LedgerError, LedgerResult};

/// Bounded retry loop around single-attempt store transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff(),
            config.max_backoff(),
        )
    }

    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the backoff after `attempt` conflicting attempts:
    /// exponential from `initial_backoff`, capped at `max_backoff`.
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Jittered backoff in `[ceiling / 2, ceiling]`.
    fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let micros = ceiling.as_micros() as u64;
        let jittered = rand::thread_rng().gen_range(micros / 2..=micros);
        Duration::from_micros(jittered)
    }

    /// Drive `attempt` until it commits, aborts, or the budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number and must perform the
    /// full read-validate-write cycle every time it is called.
    pub fn run<T, F>(&self, operation: &'static str, mut attempt: F) -> LedgerResult<T>
    where
        F: FnMut(u32) -> StoreResult<LedgerResult<T>>,
    {
        for n in 1..=self.max_attempts {
            match attempt(n) {
                Ok(Ok(value)) => {
                    debug!(operation, attempt = n, "transaction committed");
                    return Ok(value);
                }
                Ok(Err(error)) => {
                    debug!(operation, attempt = n, error = %error, "transaction aborted");
                    return Err(error);
                }
                Err(error) if error.is_conflict() => {
                    debug!(operation, attempt = n, error = %error, "transaction conflict");
                    if n < self.max_attempts {
                        let pause = self.backoff(n);
                        if !pause.is_zero() {
                            std::thread::sleep(pause);
                        }
                    }
                }
                Err(error) => return Err(LedgerError::from(error)),
            }
        }

        warn!(operation, attempts = self.max_attempts, "retry budget exhausted");
        Err(LedgerError::Aborted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
