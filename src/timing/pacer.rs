//! Frame pacer
//!
//! Keeps outbound packets on an absolute schedule: the n-th packet is due
//! at `origin + n * frame_delay`, independent of how late earlier wake-ups
//! were. Waiting sleeps coarsely until one spin threshold before the
//! deadline, then busy-polls the clock.

use crate::constants::SPIN_THRESHOLD_US;
use crate::timing::{Clock, MonotonicClock, Tick};

/// Frame pacer statistics
#[derive(Debug, Clone, Default)]
pub struct PacerStats {
    /// Deadlines waited for
    pub ticks: u64,
    /// Deadlines that had already passed when waited for
    pub late: u64,
    /// Largest lateness seen, in microseconds
    pub max_late_us: u64,
}

/// Real-time scheduler for packet transmission
pub struct FramePacer<C = MonotonicClock> {
    clock: C,
    frame_delay_us: u64,
    send_time: Option<Tick>,
    stats: PacerStats,
}

impl FramePacer<MonotonicClock> {
    /// Pacer on the process-wide monotonic clock
    pub fn monotonic(frames_per_packet: usize, sample_rate: u32) -> Self {
        Self::new(frames_per_packet, sample_rate, MonotonicClock::new())
    }
}

impl<C: Clock> FramePacer<C> {
    pub fn new(frames_per_packet: usize, sample_rate: u32, clock: C) -> Self {
        Self {
            clock,
            frame_delay_us: frame_delay_us(frames_per_packet, sample_rate),
            send_time: None,
            stats: PacerStats::default(),
        }
    }

    /// Interval between scheduled packets in microseconds
    pub fn frame_delay_us(&self) -> u64 {
        self.frame_delay_us
    }

    /// Change the packet interval; the schedule continues from the next deadline
    pub fn set_rate(&mut self, frames_per_packet: usize, sample_rate: u32) {
        self.frame_delay_us = frame_delay_us(frames_per_packet, sample_rate);
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Deadline of the next packet, if the schedule has started
    pub fn next_deadline(&self) -> Option<Tick> {
        self.send_time
    }

    /// Wait for the next scheduled slot and return the wake-up time.
    ///
    /// The first call starts the schedule at the current time and returns
    /// immediately.
    pub fn next(&mut self) -> Tick {
        let deadline = match self.send_time {
            Some(deadline) => deadline,
            None => {
                let now = self.clock.now();
                tracing::debug!(start = %now, delay_us = self.frame_delay_us, "pacer schedule started");
                now
            }
        };

        let woke = self.wait_until(deadline);
        self.send_time = Some(deadline + self.frame_delay_us);
        woke
    }

    /// Block until `deadline`; returns the time observed on wake-up
    pub fn wait_until(&mut self, deadline: Tick) -> Tick {
        self.stats.ticks += 1;

        let now = self.clock.now();
        if deadline <= now {
            let late = now.micros_since(deadline);
            if late > 0 {
                self.stats.late += 1;
                self.stats.max_late_us = self.stats.max_late_us.max(late);
                if late > self.frame_delay_us {
                    tracing::trace!(late_us = late, "pacer behind schedule");
                }
            }
            return now;
        }

        let remaining = deadline.micros_since(now);
        if remaining > SPIN_THRESHOLD_US {
            self.clock.sleep_micros(remaining - SPIN_THRESHOLD_US);
        }

        loop {
            let now = self.clock.now();
            if now >= deadline {
                return now;
            }
            std::hint::spin_loop();
        }
    }

    /// Forget the schedule; the next call to [`next`](Self::next) restarts it
    pub fn reset(&mut self) {
        self.send_time = None;
    }

    pub fn stats(&self) -> PacerStats {
        self.stats.clone()
    }
}

fn frame_delay_us(frames_per_packet: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames_per_packet as u64 * 1_000_000 / sample_rate as u64
}
