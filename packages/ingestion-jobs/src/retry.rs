//! Retry Scheduler (C6): exponential backoff with jitter, and the two
//! retry modes the original exposes as separate operations rather than one
//! policy decision the caller can't override.

use chrono::Duration;
use rand::Rng;

pub const DEFAULT_BASE_MINUTES: f64 = 5.0;
pub const DEFAULT_MAX_MINUTES: f64 = 60.0 * 24.0;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
const JITTER_FACTOR: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base_minutes: f64,
    pub max_minutes: f64,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_minutes: DEFAULT_BASE_MINUTES,
            max_minutes: DEFAULT_MAX_MINUTES,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

/// `delay = min(base * multiplier^retry_count, max) ± 25% jitter`, floored
/// at one minute so a zeroed-out jitter roll never produces an immediate
/// retry loop.
pub fn calculate_retry_delay(retry_count: u32, config: BackoffConfig) -> Duration {
    let raw = config.base_minutes * config.multiplier.powi(retry_count as i32);
    let capped = raw.min(config.max_minutes);

    let mut rng = rand::thread_rng();
    let jitter_roll: f64 = rng.gen_range(-1.0..=1.0);
    let jittered = capped + capped * JITTER_FACTOR * jitter_roll;

    Duration::milliseconds((jittered.max(1.0) * 60_000.0) as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Reset the same job row in place.
    ImmediateRetry,
    /// Create a new job row linked via `parent_job_id`.
    ChildJob,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_retry_count_within_jitter_bounds() {
        let config = BackoffConfig::default();
        for retry_count in 0..5 {
            let delay = calculate_retry_delay(retry_count, config);
            let expected_minutes = config.base_minutes * config.multiplier.powi(retry_count as i32);
            let lower = (expected_minutes * 0.75 * 60_000.0) as i64;
            let upper = (expected_minutes.min(config.max_minutes) * 1.25 * 60_000.0) as i64;
            let millis = delay.num_milliseconds();
            assert!(millis >= lower.min(60_000) - 1, "retry {retry_count}: {millis} below {lower}");
            assert!(millis <= upper + 1, "retry {retry_count}: {millis} above {upper}");
        }
    }

    #[test]
    fn delay_is_capped_at_max() {
        let config = BackoffConfig::default();
        let delay = calculate_retry_delay(20, config);
        let max_millis = (config.max_minutes * 1.25 * 60_000.0) as i64;
        assert!(delay.num_milliseconds() <= max_millis);
    }
}
