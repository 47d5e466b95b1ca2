//! Delays between Hub validation attempts.
//!
//! `HubAuthClient` retries a cookie check only when no answer arrived
//! (connect failure, deadline, 5xx). `attempt` counts failed tries so far, so
//! with `client.base_delay_ms = 50` the waits are roughly 50, 100, 200 ms up
//! to `client.max_delay_ms`. A `403` is an answer and is never retried.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (1-based; 0 means no delay).
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Up to 10% jitter so per-user servers that lost the Hub together do not
    // reconnect in lockstep.
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);

        let huge = calculate_backoff(200, 100, 1000);
        assert!(huge.as_millis() < 1100);
    }
}
