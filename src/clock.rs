use std::{thread::sleep, time::{Duration, Instant}};

/// Time source for frame pacing and the movement cadence.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        sleep(duration);
    }
}

/// Clock that only moves when told to. Sleeping advances it.
#[cfg(test)]
#[derive(Default)]
pub struct ManualClock {
    now: std::cell::Cell<Duration>,
    slept: std::cell::Cell<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.set(Duration::from_millis(ms));
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn total_slept(&self) -> Duration {
        self.slept.get()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        self.advance(duration);
    }
}
