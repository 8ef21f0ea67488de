//! Retry with exponential backoff
//!
//! Transient errors (network, rate limiting, server errors, or anything an
//! adapter tagged [`StoreError::Transient`]) are retried; everything else
//! is returned immediately. Authentication failures and missing objects
//! are never retried.

use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use vaultsync_core::config::SyncConfig;
use vaultsync_core::domain::StoreError;

/// Backoff parameters for store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each following one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Determines whether an error is transient (retryable)
///
/// Transient errors include:
/// - Anything tagged [`StoreError::Transient`]
/// - I/O timeouts and interrupted or reset connections
/// - Network errors, rate limiting (HTTP 429) and server errors (HTTP 5xx)
///   recognised from the error text
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    match StoreError::find(err) {
        Some(StoreError::Transient(_)) => return true,
        Some(_) => return false,
        None => {}
    }

    let io_transient = err.chain().any(|cause| {
        cause.downcast_ref::<std::io::Error>().is_some_and(|io| {
            matches!(
                io.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::WouldBlock
            )
        })
    });
    if io_transient {
        return true;
    }

    let err_str = format!("{err:#}").to_lowercase();

    // Network errors
    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    // Rate limiting
    if err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
    {
        return true;
    }

    // Server errors (5xx)
    err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
}

/// Executes an async operation with exponential backoff retry
///
/// Only retries on transient errors. Non-transient errors are returned
/// immediately; the last transient error is returned once the policy is
/// exhausted.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
