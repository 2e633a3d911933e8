//! Monotonic creation timestamps
//!
//! Wall-clock nanoseconds from chrono, bumped past the previously issued
//! value when the clock stalls or steps back. Every timestamp handed out is
//! unique and strictly greater than the last, so `created_at` totally orders
//! orders even when two are created within the same tick.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of `created_at` values
pub trait Clock: Send + Sync {
    /// Unix nanoseconds, strictly increasing across calls
    fn now_nanos(&self) -> i64;
}

#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn wall_nanos() -> i64 {
        // `None` only past the year 2262.
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> i64 {
        let wall = Self::wall_nanos();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let next = wall.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Deterministic clock for tests and replays: `start`, `start + step`, ...
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicI64,
    step: i64,
}

impl ManualClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            step: step.max(1),
        }
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}
