use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Timestamp;

/// Source of "now" for occupancy start times and fee computation.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock, milliseconds since the Unix epoch. Not available on wasm32;
/// the browser front end brings its own clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Timestamp::from_millis(ms as u64)
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can keep a handle after giving one to a directory.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn starting_at(ms: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(ms)),
        }
    }

    pub fn advance_millis(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_hours(&self, hours: u64) {
        self.advance_millis(hours * 3_600_000);
    }

    pub fn set(&self, ms: u64) {
        self.millis.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(10);
        let handle = clock.clone();
        handle.advance_millis(5);
        assert_eq!(clock.now(), Timestamp::from_millis(15));
        handle.advance_hours(1);
        assert_eq!(clock.now().as_millis(), 3_600_015);
        clock.set(0);
        assert_eq!(handle.now(), Timestamp::default());
    }

    #[test]
    fn system_clock_is_past_epoch() {
        assert!(SystemClock.now().as_millis() > 0);
    }
}
