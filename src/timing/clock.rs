//! Clock sources

use std::cell::Cell;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::timing::Tick;

/// Monotonic time source the pacer and registry read
pub trait Clock {
    fn now(&self) -> Tick;

    /// Coarse sleep; may overshoot
    fn sleep_micros(&self, micros: u64);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Tick {
        (**self).now()
    }

    fn sleep_micros(&self, micros: u64) {
        (**self).sleep_micros(micros)
    }
}

fn origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

/// Process-wide monotonic clock; every instance shares one origin
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        // pin the origin on first construction
        origin();
        MonotonicClock
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        Tick::from_micros(origin().elapsed().as_micros() as u64)
    }

    fn sleep_micros(&self, micros: u64) {
        std::thread::sleep(Duration::from_micros(micros));
    }
}

/// Deterministic clock for simulations and tests.
///
/// Sleeping advances time by exactly the requested amount; every `now()`
/// advances it by `step` so busy-wait loops terminate.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    step: u64,
    sleep_calls: Cell<usize>,
    slept: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: Tick, step: u64) -> Self {
        Self {
            now: Cell::new(start.as_micros()),
            step,
            sleep_calls: Cell::new(0),
            slept: Cell::new(0),
        }
    }

    /// Current time without advancing
    pub fn peek(&self) -> Tick {
        Tick::from_micros(self.now.get())
    }

    pub fn advance(&self, micros: u64) {
        self.now.set(self.now.get() + micros);
    }

    pub fn set(&self, tick: Tick) {
        self.now.set(tick.as_micros());
    }

    pub fn sleep_calls(&self) -> usize {
        self.sleep_calls.get()
    }

    pub fn slept_micros(&self) -> u64 {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        let now = self.now.get();
        self.now.set(now + self.step);
        Tick::from_micros(now)
    }

    fn sleep_micros(&self, micros: u64) {
        self.sleep_calls.set(self.sleep_calls.get() + 1);
        self.slept.set(self.slept.get() + micros);
        self.advance(micros);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        clock.sleep_micros(200);
        let b = clock.now();
        assert!(b.micros_since(a) >= 200);
    }

    #[test]
    fn test_instances_share_origin() {
        let a = MonotonicClock::new().now();
        let b = MonotonicClock::new().now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Tick::from_micros(100), 1);
        assert_eq!(clock.now(), Tick::from_micros(100));
        assert_eq!(clock.now(), Tick::from_micros(101));
        clock.sleep_micros(50);
        assert_eq!(clock.peek(), Tick::from_micros(152));
        assert_eq!(clock.sleep_calls(), 1);
        assert_eq!(clock.slept_micros(), 50);
    }
}
