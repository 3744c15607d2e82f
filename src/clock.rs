//! Time source used by the rate limiter, retry backoff and date-window expansion
//!
//! Everything that needs "now", "today" or a sleep goes through [`Clock`] so the
//! quota and backoff logic can be exercised in tests without real waiting.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

/// Capability for reading the current time and suspending the caller
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic instant used for elapsed-time accounting
    fn now(&self) -> Instant;

    /// Current local calendar date
    fn today(&self) -> NaiveDate;

    /// Suspends the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually driven clock
///
/// `sleep` returns immediately, advances the clock by the requested duration and
/// records it, so callers can assert on the exact suspensions that were requested.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    offset: Duration,
    today: NaiveDate,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at `today`
    pub fn new(today: NaiveDate) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                offset: Duration::ZERO,
                today,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Moves the clock forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        self.lock().offset += by;
    }

    /// Changes the calendar date reported by `today`
    pub fn set_today(&self, today: NaiveDate) {
        self.lock().today = today;
    }

    /// Every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().offset
    }

    fn today(&self) -> NaiveDate {
        self.lock().today
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}
