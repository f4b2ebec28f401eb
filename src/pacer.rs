//! Tick pacing
//!
//! Portable tick pacing without platform timers. The pacer only computes
//! deadlines; the caller is responsible for sleeping between ticks.

use embassy_time::{Duration, Instant};

/// Default tick rate of running effects (20 Hz).
pub const DEFAULT_TICK_HZ: u64 = 20;

/// Default tick period based on the tick rate.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1000 / DEFAULT_TICK_HZ);

/// Result of a pacing step.
#[derive(Debug, Clone, Copy)]
pub struct TickResult {
    /// The deadline for the next tick.
    pub next_deadline: Instant,
    /// How long to wait until the next tick (zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Tracks tick deadlines with drift correction.
///
/// If the loop falls behind by more than two periods (a slow driver, a
/// descheduled thread), the backlog is skipped instead of replayed as a
/// burst of back-to-back ticks.
#[derive(Debug, Clone)]
pub struct TickPacer {
    next_tick: Instant,
    period: Duration,
}

impl TickPacer {
    /// Create a pacer whose first tick is due at `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            next_tick: start,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Advance by one tick and return timing information.
    ///
    /// Call right after doing the work of a tick.
    pub fn tick(&mut self, now: Instant) -> TickResult {
        let max_drift = self.period * 2;
        if now > self.next_tick + max_drift {
            self.next_tick = now;
        }

        self.next_tick += self.period;

        let sleep_duration = self
            .next_tick
            .checked_duration_since(now)
            .unwrap_or(Duration::from_ticks(0));

        TickResult {
            next_deadline: self.next_tick,
            sleep_duration,
        }
    }
}

/// Convert an engine duration for `std::thread::sleep`.
pub(crate) fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_micros(duration.as_micros())
}
