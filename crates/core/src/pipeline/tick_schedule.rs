use std::time::{Duration, Instant};

/// Fixed-rate schedule anchored at cycle starts.
///
/// Each tick is the previous tick plus `interval`. When a cycle overruns
/// its slot the next one starts at once and later ticks count from that
/// moment, so there is never a backlog of catch-up cycles.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    interval: Duration,
    next: Instant,
}

impl TickSchedule {
    /// Schedule whose first cycle started at `start`.
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time to wait at `now` before the next cycle may start, advancing the
    /// schedule past that cycle.
    pub fn wait_from(&mut self, now: Instant) -> Duration {
        if now >= self.next {
            self.next = now + self.interval;
            return Duration::ZERO;
        }
        let wait = self.next - now;
        self.next += self.interval;
        wait
    }
}
