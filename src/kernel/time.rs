use std::time::{Duration, Instant};

/// Monotonic point in time, measured from the controller's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub since_start: Duration,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { since_start: Duration::ZERO };

    /// Negative or non-finite input clamps to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp {
            since_start: Duration::try_from_secs_f64(secs).unwrap_or_default(),
        }
    }

    /// Saturates at zero if `earlier` is actually later.
    pub fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        self.since_start.saturating_sub(earlier.since_start)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { origin: Instant::now() }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp { since_start: self.origin.elapsed() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
