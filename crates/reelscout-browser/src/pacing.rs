//! Human-like pacing: randomized pauses and stepped scrolling.

use rand::Rng;
use std::time::Duration;

/// Random duration in `[min, max]`. Returns `min` when the range is empty.
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let extra = rng.gen_range(0..=(max - min).as_millis());
    min + Duration::from_millis(u64::try_from(extra).unwrap_or(u64::MAX))
}

/// Sleep for a random duration in `[min, max]`.
pub async fn human_pause(min: Duration, max: Duration) {
    tokio::time::sleep(jitter(min, max)).await;
}

/// Split a scroll of `amount` pixels into 3-7 uneven steps that sum to `amount`.
pub fn scroll_steps(amount: i64) -> Vec<i64> {
    if amount == 0 {
        return Vec::new();
    }
    let mut rng = rand::thread_rng();
    let count: i64 = rng.gen_range(3..=7).min(amount.abs());
    let base = amount / count;
    let mut steps = vec![base; usize::try_from(count).unwrap_or(1)];
    // remainder lands on the last step
    if let Some(last) = steps.last_mut() {
        *last += amount - base * count;
    }
    steps
}
