//! Retry causes and the wait policy attached to each of them.

use std::time::Duration;

const RATE_LIMIT_BASE_MS: u64 = 1_000;
const TRANSIENT_PAUSE_MS: u64 = 1_000;
const BACKOFF_MAX_MS: u64 = 60_000;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Why an attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCause {
    /// HTTP 429: the server asked for slower traffic.
    RateLimited,
    /// Timeout or transport failure: just try again.
    Transient,
}

impl RetryCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub transient_pause: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_base: Duration::from_millis(RATE_LIMIT_BASE_MS),
            transient_pause: Duration::from_millis(TRANSIENT_PAUSE_MS),
            max_backoff: Duration::from_millis(BACKOFF_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt` (0-based).
    ///
    /// Rate limiting doubles from `rate_limit_base`; transient failures use a
    /// fixed short pause.
    pub fn wait_for(&self, cause: RetryCause, attempt: u32) -> Duration {
        match cause {
            RetryCause::RateLimited => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                self.rate_limit_base
                    .checked_mul(factor)
                    .unwrap_or(self.max_backoff)
                    .min(self.max_backoff)
            }
            RetryCause::Transient => self.transient_pause,
        }
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }
}
