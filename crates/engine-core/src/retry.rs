use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was considered fatal and should bubble up immediately.
    Fatal(E),
    /// The error was retryable, but the configured attempts were exhausted.
    AttemptsExceeded(E),
    /// Cancellation was requested while waiting to retry.
    Interrupted(E),
}

/// Bounded retry with linear backoff: after the n-th failed attempt the
/// policy waits `base_delay * n` before trying again.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        self.base_delay.saturating_mul(attempt as u32)
    }

    /// Executes the operation with the configured retry policy.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        self.run_until_cancelled(op, classify, &CancellationToken::new())
            .await
    }

    /// Like [`RetryPolicy::run`], but a backoff sleep ends early with
    /// [`RetryError::Interrupted`] once `cancel` fires. An attempt already in
    /// flight is never interrupted.
    pub async fn run_until_cancelled<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt >= self.max_attempts {
                            return Err(RetryError::AttemptsExceeded(err));
                        }

                        let delay = self.delay_after(attempt);
                        warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Attempt failed, retrying"
                        );

                        tokio::select! {
                            _ = sleep(delay) => {}
                            _ = cancel.cancelled() => return Err(RetryError::Interrupted(err)),
                        }
                        attempt += 1;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn fast(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_succeeds_on_last_allowed_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result = fast(3)
            .run(
                || {
                    let c = c.clone();
                    async move {
                        let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                        if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result: Result<(), _> = fast(3)
            .run(
                || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err("boom".to_string())
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert!(matches!(result, Err(RetryError::AttemptsExceeded(ref e)) if e == "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result: Result<(), _> = fast(5)
            .run(
                || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err("fatal".to_string())
                    }
                },
                |_| RetryDisposition::Stop,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_cuts_backoff_short() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = RetryPolicy::new(3, Duration::from_secs(60));

        let result: Result<(), _> = policy
            .run_until_cancelled(
                || async { Err("down".to_string()) },
                |_| RetryDisposition::Retry,
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Interrupted(_))));
    }
}
