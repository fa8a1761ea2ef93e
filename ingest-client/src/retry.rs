//! Fixed-delay retry policy.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::UploadConfig;

/// Default attempt budget, including the first attempt
pub const MAX_RETRIES: u32 = 3;

/// Default pause between attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Retries a fallible async operation with a fixed delay between attempts.
///
/// Errors are never inspected: every failure is retryable until the budget
/// runs out, at which point the last error is returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    /// Value of the `operation` label on `ingest_retries_total`
    operation: &'static str,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// A budget of zero attempts is raised to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            operation: "unnamed",
        }
    }

    /// Name the wrapped operation for retry metrics
    pub fn for_operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// `label` identifies this particular call in logs, e.g. a part number.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    warn!(
                        operation = self.operation,
                        label = %label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Attempt failed, retrying in {}ms",
                        self.delay.as_millis()
                    );
                    metrics::counter!("ingest_retries_total", "operation" => self.operation)
                        .increment(1);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
