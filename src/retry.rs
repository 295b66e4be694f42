//! Bounded retry for transient store failures
//!
//! Attempts are strictly sequential. Attempt `n` (1-based) that fails is
//! followed by a sleep of `delay * n` before attempt `n + 1`. Whatever error
//! ends the loop is passed through [`classify`] exactly once.

use std::time::Duration;

use tracing::warn;

use crate::error::{classify, LedgerError, LedgerResult};

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total attempts including the first; values below 1 are treated as 1
    pub max_attempts: u32,
    /// Base delay between attempts
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryOptions {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Delay slept after failed attempt number `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

/// Retry everything except validation failures
pub fn with_retry<T, F>(options: RetryOptions, operation: F) -> LedgerResult<T>
where
    F: FnMut() -> LedgerResult<T>,
{
    with_retry_if(options, |err| !err.is_validation(), operation)
}

/// Retry only aborted transactions
pub fn with_transaction_retry<T, F>(options: RetryOptions, operation: F) -> LedgerResult<T>
where
    F: FnMut() -> LedgerResult<T>,
{
    with_retry_if(options, LedgerError::is_transaction_failure, operation)
}

/// Retry while `should_retry` accepts the error and attempts remain
pub fn with_retry_if<T, F, P>(
    options: RetryOptions,
    should_retry: P,
    mut operation: F,
) -> LedgerResult<T>
where
    F: FnMut() -> LedgerResult<T>,
    P: Fn(&LedgerError) -> bool,
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                let delay = backoff_delay(options.delay, attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(classify(err)),
        }
    }
}
