use rand::{RngExt, rng};
use std::time::Duration;

/// Retry policy for upstream calls: exponential backoff with full jitter.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Run `f` until it succeeds, `should_retry` rejects the error, or the
    /// retry budget is spent.
    pub async fn retry_async<F, Fut, T, E, P>(&self, mut f: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let max_delay = self.base_delay * (1u32 << attempt.min(16));
                    let max_ms = max_delay.as_millis() as u64;
                    let jitter = if max_ms == 0 {
                        0
                    } else {
                        rng().random_range(0..max_ms)
                    };
                    tracing::debug!(attempt, delay_ms = jitter, "retrying upstream call");
                    tokio::time::sleep(Duration::from_millis(jitter)).await;
                }
            }
        }
    }
}
