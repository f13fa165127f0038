use log::warn;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff applied around a fallible async call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self { max_attempts, initial_backoff, max_backoff }
    }

    /// Wait after the given failed attempt (1-based) before trying again.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let scaled = self.initial_backoff.saturating_mul(1u32 << exponent);
        scaled.max(self.initial_backoff).min(self.max_backoff)
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached, sleeping between
/// attempts. The error of the last attempt is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F
) -> Result<T, E>
    where F: FnMut(u32) -> Fut, Fut: Future<Output = Result<T, E>>, E: Display
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let wait = policy.backoff_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e);
            }
        }
    }
}
