//! Monotonic timing for trials
//!
//! Built on `std::time::Instant`, which is immune to wall-clock steps. A
//! readback that goes backwards is clamped to zero and flagged instead of
//! propagating a negative duration.

use std::time::{Duration, Instant};

/// Elapsed time between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elapsed {
    /// Non-negative duration
    pub duration: Duration,
    /// True when `end` preceded `start` and the result was clamped
    pub clamped: bool,
}

/// Stateless clock access
pub struct Timer;

impl Timer {
    /// Sample the monotonic clock
    #[inline(always)]
    pub fn now() -> Instant {
        Instant::now()
    }

    /// Duration from `start` to `end`, clamped to zero
    pub fn elapsed(start: Instant, end: Instant) -> Elapsed {
        match end.checked_duration_since(start) {
            Some(duration) => Elapsed {
                duration,
                clamped: false,
            },
            None => {
                tracing::warn!("clock readback went backwards, clamping to zero");
                Elapsed {
                    duration: Duration::ZERO,
                    clamped: true,
                }
            }
        }
    }
}

/// A started measurement
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self { start: Timer::now() }
    }

    pub fn stop(self) -> Elapsed {
        Timer::elapsed(self.start, Timer::now())
    }
}
