//! Per-alias rate limiting policy.
//!
//! A leaky bucket over the alias's `next_delivery` clock: every accepted
//! resolution pushes the clock forward by a fixed interval, and the clock
//! is clamped so it never falls behind `now - window`. The clamp bounds
//! the burst an idle alias can accept; the interval bounds the sustained
//! rate. The clamp applies on the accept path only - a rejected
//! resolution leaves the clock untouched.

use crate::config::LimitsConfig;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Delivery permitted; persist the new clock value.
    Allowed {
        /// Updated `next_delivery` for the alias.
        next_delivery: i64,
    },
    /// Delivery not permitted yet; the clock stays as it is.
    Limited,
}

/// Rate-limit policy shared by all aliases.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: i64,
    window: i64,
    blocked_backoff: i64,
}

impl RateLimiter {
    /// Build the policy from the configured limits.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            interval: limits.rate_interval_secs,
            window: limits.rate_window_secs,
            blocked_backoff: limits.blocked_backoff_secs,
        }
    }

    /// Decide whether an alias with the given clock may deliver at `now`.
    pub fn check(&self, next_delivery: i64, now: i64) -> Gate {
        if next_delivery > now {
            return Gate::Limited;
        }
        Gate::Allowed {
            next_delivery: (next_delivery + self.interval).max(now - self.window),
        }
    }

    /// Earliest clock value for an alias whose chat blocked the bot.
    pub fn backoff_floor(&self, now: i64) -> i64 {
        now + self.blocked_backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(interval: i64, window: i64, backoff: i64) -> RateLimiter {
        RateLimiter::new(&LimitsConfig {
            rate_interval_secs: interval,
            rate_window_secs: window,
            blocked_backoff_secs: backoff,
            ..LimitsConfig::default()
        })
    }

    #[test]
    fn test_due_alias_is_allowed_and_advanced_by_interval() {
        let limiter = limiter(60, 3600, 86400);
        let now = 100_000;

        // Clock in the recent past: plain advance.
        match limiter.check(now - 10, now) {
            Gate::Allowed { next_delivery } => assert_eq!(next_delivery, now - 10 + 60),
            Gate::Limited => panic!("expected Allowed"),
        }

        // Clock exactly at now is still due.
        match limiter.check(now, now) {
            Gate::Allowed { next_delivery } => assert_eq!(next_delivery, now + 60),
            Gate::Limited => panic!("expected Allowed"),
        }
    }

    #[test]
    fn test_idle_alias_is_clamped_to_window() {
        let limiter = limiter(60, 3600, 86400);
        let now = 100_000;

        // An alias idle for days cannot accumulate unbounded permission:
        // the clock is pulled up to now - window.
        match limiter.check(0, now) {
            Gate::Allowed { next_delivery } => assert_eq!(next_delivery, now - 3600),
            Gate::Limited => panic!("expected Allowed"),
        }
    }

    #[test]
    fn test_clamp_never_decreases_the_clock() {
        let limiter = limiter(60, 3600, 86400);
        let now = 100_000;

        // Advance already past now - window: clamp must not pull it back.
        let next_delivery = now - 30;
        match limiter.check(next_delivery, now) {
            Gate::Allowed { next_delivery: updated } => {
                assert_eq!(updated, next_delivery + 60);
                assert!(updated > next_delivery);
            }
            Gate::Limited => panic!("expected Allowed"),
        }
    }

    #[test]
    fn test_future_clock_is_limited_and_unchanged() {
        let limiter = limiter(60, 3600, 86400);
        let now = 100_000;

        assert_eq!(limiter.check(now + 1, now), Gate::Limited);
        assert_eq!(limiter.check(now + 99_999, now), Gate::Limited);
    }

    #[test]
    fn test_window_bounds_burst_size() {
        let limiter = limiter(60, 3600, 86400);
        let now = 100_000;

        // Starting from a long-idle clock, successive accepts are allowed
        // until the clock crosses now: at most window/interval + 1 bursts.
        let mut clock = 0;
        let mut accepted = 0;
        loop {
            match limiter.check(clock, now) {
                Gate::Allowed { next_delivery } => {
                    clock = next_delivery;
                    accepted += 1;
                }
                Gate::Limited => break,
            }
        }
        assert_eq!(accepted, 3600 / 60 + 1);
    }

    #[test]
    fn test_backoff_floor() {
        let limiter = limiter(60, 3600, 86400);
        assert_eq!(limiter.backoff_floor(100_000), 186_400);
    }
}
