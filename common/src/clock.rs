use std::{
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use crate::agent::Clock;

/// Milliseconds since the first call in this process.
pub fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Wall-time clock for the real loop: `std::time::Instant` and a blocking sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        monotonic_ms()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_ms_never_goes_backwards() {
        let first = monotonic_ms();
        let mut clock = SystemClock;
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now_ms() >= first + 2);
    }
}
