use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Default poll interval between result fetch attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maps a zero-based retry attempt to the delay before the next result fetch.
#[derive(Clone)]
pub struct BackoffPolicy(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl BackoffPolicy {
    /// Wraps an arbitrary stateless interval function.
    #[must_use]
    pub fn from_fn(interval: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self(Arc::new(interval))
    }

    /// Waits the same interval before every retry.
    #[must_use]
    pub fn constant(interval: Duration) -> Self {
        Self::from_fn(move |_| interval)
    }

    /// Retries without sleeping (busy poll).
    #[must_use]
    pub fn immediate() -> Self {
        Self::constant(Duration::ZERO)
    }

    /// Doubles the interval on every attempt starting at `base`, capped at `max`.
    #[must_use]
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::from_fn(move |attempt| {
            let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
            base.checked_mul(factor).unwrap_or(max).min(max)
        })
    }

    /// Returns the delay to wait after the given attempt.
    #[must_use]
    pub fn interval(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::constant(DEFAULT_POLL_INTERVAL)
    }
}

impl Debug for BackoffPolicy {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BackoffPolicy(..)")
    }
}
