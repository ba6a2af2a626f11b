/*!
 * Generic retrying call wrapper.
 *
 * An operation is attempted up to `max_attempts` times. Between attempts the
 * wrapper sleeps according to a backoff schedule; the sleep is abandoned as soon
 * as the cancellation token fires.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio_util::sync::CancellationToken;

/// How often and how patiently to retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before retry N is `backoff[N - 1]`; the last entry repeats
    pub backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Retry without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Vec::new())
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.backoff.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempt.saturating_sub(1) as usize).min(self.backoff.len() - 1);
        self.backoff[index]
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            3,
            vec![Duration::from_secs(2), Duration::from_secs(5), Duration::from_secs(5)],
        )
    }
}

/// Why a retried call produced no value
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last error
    Exhausted { attempts: u32, last_error: E },
    /// The token fired before an attempt could succeed
    Cancelled,
}

/// Run `operation` until it succeeds, attempts run out, or `cancel` fires.
///
/// The closure receives the 1-based attempt number. On success the value is
/// returned together with the number of attempts it took.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<(T, u32), RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => error,
        };

        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        if attempt >= policy.max_attempts {
            return Err(RetryError::Exhausted { attempts: attempt, last_error: error });
        }

        let delay = policy.delay_after(attempt);
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt, policy.max_attempts, error, delay
        );

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
