//! Monotonic time and real-time packet pacing

pub mod clock;
pub mod pacer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use pacer::{FramePacer, PacerStats};

use std::fmt;
use std::ops::{Add, Sub};

/// Monotonic timestamp in microseconds since process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn from_micros(micros: u64) -> Self {
        Tick(micros)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Microseconds from `earlier` to `self`, zero if `earlier` is later
    pub fn micros_since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for Tick {
    type Output = Tick;

    fn add(self, micros: u64) -> Tick {
        Tick(self.0.saturating_add(micros))
    }
}

impl Sub<u64> for Tick {
    type Output = Tick;

    fn sub(self, micros: u64) -> Tick {
        Tick(self.0.saturating_sub(micros))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}s", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}
