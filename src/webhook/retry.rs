//! Exponential backoff with jitter for webhook retries: a retry-on-429/5xx
//! idiom adapted to a blocking `ureq` send loop instead of a tokio future.

use std::time::Duration;

use rand::Rng;

/// Compute the backoff delay for the given 1-indexed attempt number,
/// capped at `max_backoff_ms`, with 0-25% jitter added to avoid
/// thundering-herd retries across concurrent hook invocations.
pub fn backoff_delay(attempt: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Duration {
    let exp = initial_backoff_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    let base = exp.min(max_backoff_ms);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..0.25);
    let jittered = base as f64 * (1.0 + jitter_fraction);
    Duration::from_millis(jittered as u64)
}

/// Whether an HTTP status code should be retried. 429 and 5xx are
/// retryable; everything else (2xx success, 4xx client error other than
/// 429) is not.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let d1 = backoff_delay(1, 100, 5_000);
        let d4 = backoff_delay(4, 100, 5_000);
        let d_capped = backoff_delay(20, 100, 5_000);
        assert!(d1.as_millis() >= 100);
        assert!(d4 > d1);
        assert!(d_capped.as_millis() <= 5_000 * 125 / 100 + 1);
    }
}
