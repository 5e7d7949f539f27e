// Bounded retry for transient concurrency conflicts

use crate::types::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for operations that can fail with a transient
/// `ConcurrencyConflict` (serialization failures, lost compare-and-set).
///
/// Retries are bounded and backed off linearly; any non-retryable error is
/// surfaced immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
        }
    }

    /// Run `op`, retrying while it fails with a retryable error.
    ///
    /// The operation is re-invoked from scratch on each attempt, so callers
    /// must re-read any state the decision depends on inside `op`.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        operation = op_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "retrying after concurrency conflict"
                    );
                    tokio::time::sleep(self.base_backoff * attempt).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClinicError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = policy
            .run("test-op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ClinicError::ConcurrencyConflict("lost cas".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_conflict_when_attempts_exhaust() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result: crate::Result<()> = policy
            .run("test-op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClinicError::ConcurrencyConflict("still conflicting".into())) }
            })
            .await;

        assert!(matches!(result, Err(ClinicError::ConcurrencyConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_logical_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: crate::Result<()> = policy
            .run("test-op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClinicError::validation("reason", "must not be empty")) }
            })
            .await;

        assert!(matches!(result, Err(ClinicError::Validation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
