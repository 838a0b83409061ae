use std::time::{Duration, Instant};

/// Keeps track of how long a submission round took.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new `Timer` started at the current instant.
    pub fn now() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Reset internal timer to now.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Time since the timer was created or last reset.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
