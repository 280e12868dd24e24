//! Wall-clock access and periodic scheduling.
//!
//! The reminder engine never reads the system time directly. It is handed a
//! [`Clock`] and registered on an [`IntervalScheduler`], so tests can swap in
//! [`ManualClock`] and [`ManualScheduler`] and step time deterministically.

mod scheduler;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Datelike, Local, NaiveDateTime, Utc};

pub use scheduler::{CancelHandle, IntervalScheduler, ManualScheduler, ThreadScheduler};

use crate::schedule::{ClockTime, Weekday};

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Milliseconds since the epoch, used for de-duplication windows.
    fn now_ms(&self) -> i64 {
        self.now().and_utc().timestamp_millis()
    }

    fn weekday(&self) -> Weekday {
        Weekday::from(self.now().weekday())
    }

    /// Time of day truncated to the minute.
    fn time_of_day(&self) -> ClockTime {
        ClockTime::from_time(self.now().time())
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A settable clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}
