//! Bounded retry with exponential backoff around a dataset provider.
//!
//! Provider calls are synchronous and cannot be interrupted, so the per-call
//! deadline is checked when the call returns: a late answer is discarded and
//! treated as a transient [`ProviderError::Timeout`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::graph::{OrderKey, Row};

use super::DatasetProvider;

/// How often and how patiently to retry transient provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Sleep before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubled backoff.
    pub max_backoff_ms: u64,
    /// Deadline for a single call; `None` disables it.
    pub call_timeout_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            call_timeout_ms: None,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no deadline.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            call_timeout_ms: None,
        }
    }

    /// Backoff to sleep after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

/// Provider decorator applying a [`RetryPolicy`] to every call.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: DatasetProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn call<T>(
        &self,
        operation: &str,
        f: impl Fn(&P) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let result = f(&self.inner).and_then(|value| match self.policy.call_timeout() {
                Some(limit) if started.elapsed() > limit => Err(ProviderError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                }),
                _ => Ok(value),
            });

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(err);
                }
                tracing::error!(operation, attempts = attempt, error = %err, "provider call failed");
                return Err(ProviderError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let backoff = self.policy.backoff(attempt);
            tracing::warn!(
                operation,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "transient provider error, retrying"
            );
            if !backoff.is_zero() {
                std::thread::sleep(backoff);
            }
        }
    }
}

impl<P: DatasetProvider> DatasetProvider for RetryingProvider<P> {
    fn count(&self) -> ProviderResult<u64> {
        self.call("count", |p| p.count())
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        self.call("window", |p| p.window(order, limit, offset))
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        self.call("aggregate query", |p| p.run_aggregate_query(query))
    }
}
