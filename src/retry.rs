//! Bounded retry of API calls on the transient write-conflict signal.

use crate::core::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{Level, event};

/// Signal the Wikibase API returns when an edit collides with concurrent edits.
pub const DEFAULT_CONFLICT_SIGNAL: &str = "failed-save";

/// Configuration for retry behavior on transient write conflicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations allowed, first one included.
    pub max_attempts: u32,
    /// Fixed pause between attempts in milliseconds.
    pub delay_ms: u64,
    /// Error code that marks a failure as retry-safe.
    pub retryable_signal: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 15_000,
            retryable_signal: DEFAULT_CONFLICT_SIGNAL.to_string(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            ..Self::default()
        }
    }

    pub fn retryable_signal(mut self, signal: impl Into<String>) -> Self {
        self.retryable_signal = signal.into();
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.retryable_signal.trim().is_empty() {
            return Err("retryable_signal must not be empty".to_string());
        }
        Ok(())
    }

    fn is_retryable(&self, err: &SweepError) -> bool {
        err.conflict_signal() == Some(self.retryable_signal.as_str())
    }
}

/// Counters of what the caller did so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub invocations: u64,
    pub backoffs: u64,
    pub exhausted: u64,
}

/// Wraps single API invocations with the retry policy.
///
/// This is the only component that sleeps between attempts.
#[derive(Debug, Default)]
pub struct RetryingCaller {
    policy: RetryPolicy,
    invocations: AtomicU64,
    backoffs: AtomicU64,
    exhausted: AtomicU64,
}

impl RetryingCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            backoffs: self.backoffs.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Invokes `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempts run out. The last failure is returned.
    pub async fn call<T, F, Fut>(&self, action: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            self.invocations.fetch_add(1, Ordering::Relaxed);
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.policy.is_retryable(&err) {
                event!(Level::ERROR, action, error = %err, "request failed");
                return Err(err);
            }
            if attempt >= max_attempts {
                self.exhausted.fetch_add(1, Ordering::Relaxed);
                event!(
                    Level::ERROR,
                    action,
                    attempts = attempt,
                    error = %err,
                    "transient conflict persisted, giving up"
                );
                return Err(err);
            }

            event!(
                Level::WARN,
                action,
                attempt,
                max_attempts,
                delay_ms = self.policy.delay_ms,
                "failed to save, should retry shortly"
            );
            self.backoffs.fetch_add(1, Ordering::Relaxed);
            sleep(Duration::from_millis(self.policy.delay_ms)).await;
            attempt += 1;
        }
    }
}
