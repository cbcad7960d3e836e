use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Wall-clock provider. Timers compute elapsed/remaining time from absolute
/// timestamps taken through this trait, so a suspended process picks up
/// exactly where the wall clock says it should.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually stepped clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, value: DateTime<Utc>) {
        let mut now = self.lock();
        *now = value;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.lock();
        *now = *now + Duration::seconds(seconds);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
