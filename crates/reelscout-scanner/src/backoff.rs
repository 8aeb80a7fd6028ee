//! Bounded exponential backoff.

use std::time::Duration;

/// Maximum number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_secs(2);

/// Growth factor between consecutive delays.
pub const BACKOFF_FACTOR: u32 = 2;

/// Upper bound on any single delay.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry schedule shared by every [`Backoff`] it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base: BASE_DELAY,
            factor: BACKOFF_FACTOR,
            cap: MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Start a fresh retry sequence.
    #[must_use]
    pub fn start(self) -> Backoff {
        Backoff {
            policy: self,
            retries: 0,
            next_delay: self.base.min(self.cap),
        }
    }
}

/// Retry state for one operation: how many retries were spent and how long
/// to wait before the next.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    retries: u32,
    next_delay: Duration,
}

impl Backoff {
    /// Record a failed attempt. Returns the delay to wait before retrying,
    /// or `None` once the retry budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.policy.max_retries {
            return None;
        }
        self.retries += 1;
        let delay = self.next_delay;
        self.next_delay = delay
            .checked_mul(self.policy.factor)
            .map_or(self.policy.cap, |d| d.min(self.policy.cap));
        Some(delay)
    }

    /// Retries already granted.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_constants() {
        const _: () = assert!(MAX_RETRIES > 0);
        const _: () = assert!(MAX_RETRIES <= 5);
        assert!(BASE_DELAY >= Duration::from_secs(1));
        assert!(MAX_DELAY >= BASE_DELAY);
    }

    #[test]
    fn test_default_sequence() {
        let mut backoff = BackoffPolicy::default().start();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(8)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.retries(), 3);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = BackoffPolicy {
            max_retries: 10,
            ..BackoffPolicy::default()
        };
        let delays: Vec<_> = std::iter::from_fn({
            let mut backoff = policy.start();
            move || backoff.next_delay()
        })
        .collect();

        assert_eq!(delays.len(), 10);
        assert!(delays.iter().all(|d| *d <= MAX_DELAY));
        assert_eq!(delays.last(), Some(&MAX_DELAY));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_zero_retries() {
        let mut backoff = BackoffPolicy {
            max_retries: 0,
            ..BackoffPolicy::default()
        }
        .start();
        assert_eq!(backoff.next_delay(), None);
    }
}
