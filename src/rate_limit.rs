//! Per-minute quota enforcement for bulk provider calls
//!
//! The provider allows a fixed number of calls per minute. During bootstrap the
//! place lookup runs once per known country, which is far more than one quota,
//! so every call goes through [`RateLimiter::acquire`] first.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::Clock;

/// Calls allowed per quota window
pub const DEFAULT_MAX_CALLS: usize = 40;

/// Length of the provider's quota window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Extra wait added on top of the remaining window time
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(10);

/// Quota settings for a [`RateLimiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Calls allowed per window
    pub max_calls: usize,
    /// Quota window length
    pub window: Duration,
    /// Safety margin added to every suspension
    pub buffer: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            window: DEFAULT_WINDOW,
            buffer: DEFAULT_BUFFER,
        }
    }
}

/// Computes how long the next call must wait
///
/// `calls_in_window` is the number of calls already tracked and `elapsed` the time
/// since the oldest of them. A suspension is only due once a full quota has been
/// used and the window it was used in has not yet closed.
pub fn suspension_for(
    config: &RateLimitConfig,
    calls_in_window: usize,
    elapsed: Duration,
) -> Option<Duration> {
    if config.max_calls == 0 || calls_in_window == 0 || calls_in_window % config.max_calls != 0 {
        return None;
    }
    if elapsed >= config.window {
        return None;
    }
    Some(config.window - elapsed + config.buffer)
}

/// Sliding-window limiter shared by every caller of a rate-limited endpoint
///
/// The call history is behind an async mutex that stays held while sleeping, so
/// concurrent callers are accounted against one shared sequence of calls.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    calls: Mutex<VecDeque<std::time::Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            calls: Mutex::new(VecDeque::with_capacity(config.max_calls)),
        }
    }

    /// Waits until one more call fits in the quota, then records it
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;

        if calls.len() >= self.config.max_calls {
            if let Some(oldest) = calls.front().copied() {
                let elapsed = self.clock.now().saturating_duration_since(oldest);
                if let Some(pause) = suspension_for(&self.config, calls.len(), elapsed) {
                    warn!(
                        calls = calls.len(),
                        elapsed_secs = elapsed.as_secs(),
                        pause_secs = pause.as_secs(),
                        "provider quota reached, suspending calls"
                    );
                    self.clock.sleep(pause).await;
                }
            }
            while calls.len() >= self.config.max_calls {
                calls.pop_front();
            }
        }

        calls.push_back(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()))
    }

    #[test]
    fn test_suspension_for_full_quota_inside_window() {
        let config = RateLimitConfig::default();
        let pause = suspension_for(&config, 40, Duration::from_secs(5));
        assert_eq!(pause, Some(Duration::from_secs(60 - 5 + 10)));
    }

    #[test]
    fn test_suspension_for_partial_quota_is_none() {
        let config = RateLimitConfig::default();
        assert_eq!(suspension_for(&config, 39, Duration::from_secs(1)), None);
        assert_eq!(suspension_for(&config, 0, Duration::ZERO), None);
    }

    #[test]
    fn test_suspension_for_closed_window_is_none() {
        let config = RateLimitConfig::default();
        assert_eq!(suspension_for(&config, 40, Duration::from_secs(60)), None);
        assert_eq!(suspension_for(&config, 40, Duration::from_secs(75)), None);
    }

    #[test]
    fn test_suspension_for_custom_buffer() {
        let config = RateLimitConfig {
            max_calls: 2,
            window: Duration::from_secs(10),
            buffer: Duration::ZERO,
        };
        assert_eq!(
            suspension_for(&config, 2, Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
    }

    #[tokio::test]
    async fn test_forty_calls_in_five_seconds_suspends_call_41() {
        let clock = manual_clock();
        let limiter = RateLimiter::new(RateLimitConfig::default(), clock.clone());

        for i in 0..40 {
            limiter.acquire().await;
            if i < 39 {
                clock.advance(Duration::from_millis(125));
            }
        }
        // 39 * 125ms = 4.875s since the first call; round up to 5s
        clock.advance(Duration::from_millis(125));
        assert!(clock.sleeps().is_empty(), "no suspension within the first 40 calls");

        limiter.acquire().await;

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60 - 5 + 10)]);
    }

    #[tokio::test]
    async fn test_thirty_nine_calls_never_suspend() {
        let clock = manual_clock();
        let limiter = RateLimiter::new(RateLimitConfig::default(), clock.clone());

        for _ in 0..39 {
            limiter.acquire().await;
        }

        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_slow_calls_never_suspend() {
        let clock = manual_clock();
        let limiter = RateLimiter::new(RateLimitConfig::default(), clock.clone());

        for _ in 0..100 {
            limiter.acquire().await;
            clock.advance(Duration::from_secs(2));
        }

        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_no_more_than_quota_in_any_window() {
        let clock = manual_clock();
        let config = RateLimitConfig::default();
        let limiter = RateLimiter::new(config, clock.clone());
        let mut stamps = Vec::new();

        for _ in 0..200 {
            limiter.acquire().await;
            stamps.push(clock.now());
            clock.advance(Duration::from_millis(10));
        }

        for (i, start) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < config.window)
                .count();
            assert!(in_window <= config.max_calls, "{} calls in one window", in_window);
        }
    }
}
