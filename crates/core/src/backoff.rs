//! Full-jitter exponential backoff.

use std::time::Duration;

/// Upper bound on the backoff exponent; keeps `2^(attempt + 2)` inside u64.
const MAX_EXPONENT: u32 = 62;

/// Compute the delay before re-attempting after `attempt` failed attempts.
///
/// `interval_ms * ceil(r * (2^(attempt + 2) - 1))` milliseconds, with `r`
/// uniform in `[0, 1)`. The multiplier is sampled fresh on every call, so two
/// calls with the same attempt number rarely agree, but the window it is
/// drawn from doubles per attempt.
pub fn compute_delay(interval_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_add(2).min(MAX_EXPONENT);
    let window = (1u64 << exponent) - 1;
    let multiplier = (rand::random::<f64>() * window as f64).ceil() as u64;
    Duration::from_millis(interval_ms.saturating_mul(multiplier))
}
