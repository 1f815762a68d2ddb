//! Retry policy
//!
//! Decides, per failed attempt, whether to retry and after what delay.
//! Three failure classes are distinguished: transport failures, server-error
//! statuses, and explicit rate-limit signals. For rate limits the delay always
//! honors the server-suggested wait at minimum; a shorter client-computed
//! backoff never overrides it.

use std::time::Duration;

/// Failure classes the policy can be consulted about
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The exchange could not be completed (DNS, connection, timeout)
    Transport(String),
    /// The exchange completed with a server-error status (5xx)
    ServerError(u16),
    /// Explicit throttling signal with a server-suggested wait
    RateLimited {
        /// Wait the server asked for; defaulted when the server sent none
        retry_after: Duration,
    },
}

/// Retry policy parameters
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total executor invocations allowed per logical call (initial + retries)
    pub max_attempts: u32,
    /// Backoff for the first retry
    pub base_delay: Duration,
    /// Exponential growth factor between retries
    pub multiplier: f64,
    /// Cap on any computed backoff
    pub max_delay: Duration,
    /// Add up to 25% random jitter to computed backoffs
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // Initial attempt plus 5 retries: enough to ride out transient
        // failures without looping on persistent ones.
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries (single attempt per call)
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decide whether to retry after `attempt` completed executor invocations.
    ///
    /// Returns the delay to sleep before re-entering the queue, or `None` to
    /// surface the failure. Attempts are 1-indexed: after the first invocation
    /// `attempt` is 1.
    pub fn next_delay(&self, attempt: u32, failure: &Failure) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.backoff(attempt);
        match failure {
            Failure::Transport(_) | Failure::ServerError(_) => Some(backoff),
            // The server's wait wins over any shorter computed backoff;
            // undercutting it escalates throttling.
            Failure::RateLimited { retry_after } => Some(backoff.max(*retry_after)),
        }
    }

    /// Exponential backoff for the given 1-indexed attempt, capped and jittered.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let base_ms = self.base_delay.as_millis() as f64;
        let raw_ms = base_ms * self.multiplier.powi(exp as i32);
        let capped = Duration::from_millis(raw_ms as u64).min(self.max_delay);

        if self.jitter {
            let spread = (capped.as_millis() as f64 * 0.25) as u64;
            if spread > 0 {
                return capped + Duration::from_millis(rand::random::<u64>() % spread);
            }
        }
        capped
    }
}
