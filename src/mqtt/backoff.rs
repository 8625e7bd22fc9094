//! Pacing for reconnect attempts after an established session drops
//!
//! The event loop reconnects every time it is polled, so the supervisor has
//! to wait between failed polls itself. The delay doubles from `initial` up
//! to `max` and stays there; attempts are unbounded.
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max)
//! ```
//!
//! The initial connect does not use this, it retries on a fixed interval.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    current_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    attempt: u32,
}

impl Backoff {
    /// A multiplier below 1.0 is treated as 1.0 (constant delay)
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay: initial,
            current_delay: initial.min(max),
            max_delay: max,
            multiplier: multiplier.max(1.0),
            attempt: 0,
        }
    }

    /// Call after a successful connect
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay.min(self.max_delay);
        self.attempt = 0;
    }

    /// Returns the delay before the next attempt and advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let sleep = self.current_delay;

        let next = self.current_delay.as_secs_f64() * self.multiplier;
        self.current_delay = Duration::from_secs_f64(next.min(self.max_delay.as_secs_f64()));

        sleep
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    /// 1s, 2s, 4s ... capped at one minute
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 2.0)
    }
}
