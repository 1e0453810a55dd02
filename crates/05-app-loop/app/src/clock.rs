//! Time sources for latency measurement and throttling.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn now_ms(&self) -> f64;
}

/// Wall-clock backed [`Clock`] measured from construction.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock shared between a test and the runtime it drives.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    /// Moves time forward; negative deltas are ignored.
    pub fn advance(&self, delta_ms: f64) {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            *self.now.lock() += delta_ms;
        }
    }

    /// Jumps to `ms` if it is not in the past.
    pub fn set(&self, ms: f64) {
        let mut now = self.now.lock();
        if ms > *now {
            *now = ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_forward() {
        let clock = ManualClock::new(10.0);
        let shared = clock.clone();
        shared.advance(5.0);
        shared.advance(-100.0);
        assert_eq!(clock.now_ms(), 15.0);
        clock.set(3.0);
        assert_eq!(clock.now_ms(), 15.0);
        clock.set(40.0);
        assert_eq!(shared.now_ms(), 40.0);
    }
}
