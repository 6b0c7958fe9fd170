//! Exponential backoff, with and without jitter.

use std::time::Duration;
use rand::Rng;

/// Deterministic capped exponential delay: `min(base_ms * 2^attempt, max_ms)`.
///
/// Attempt 0 yields `base_ms`.
pub fn exponential_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

/// Calculate exponential backoff delay with jitter.
///
/// Attempt 0 means "first try" and never waits; attempt `n` waits roughly
/// `base_ms * 2^(n-1)`, capped at `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let capped_delay = exponential_delay(attempt - 1, base_ms, max_ms).as_millis() as u64;

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
