//! Spacing between extractions.

use rand::Rng;
use std::time::Duration;

/// Delay between consecutive extractions, plus up to `jitter` extra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimit {
    pub delay: Duration,
    pub jitter: Duration,
}

impl RateLimit {
    #[must_use]
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    fn next_spacing(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        self.delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Paces extractions: a full delay after each finished item, and a longer
/// one before each retry.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    owed: bool,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        Self { limit, owed: false }
    }

    /// Mark an item as finished. The next [`acquire`](Self::acquire) waits
    /// the full delay, however long discovery took in between.
    pub fn finish_item(&mut self) {
        self.owed = true;
    }

    /// Wait out the delay owed by the previous item. The first call never waits.
    pub async fn acquire(&mut self) {
        if !std::mem::take(&mut self.owed) {
            return;
        }
        let wait = self.limit.next_spacing();
        if !wait.is_zero() {
            tracing::trace!(?wait, "rate limiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Delay before retrying a failed attempt: the request delay plus the
    /// backoff step, so a retry always waits longer than a regular item.
    #[must_use]
    pub fn retry_delay(&self, backoff: Duration) -> Duration {
        self.limit.next_spacing().saturating_add(backoff)
    }
}
