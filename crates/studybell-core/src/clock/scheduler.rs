use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, error};

use super::{Clock, ManualClock};

pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Registers a callback to run every `interval`.
///
/// Implementations run the callbacks of one registration sequentially: a
/// tick runs to completion before the next one can start.
pub trait IntervalScheduler {
    /// # Errors
    /// Returns an error if the underlying timer resource cannot be created.
    fn every(&self, interval: Duration, callback: TickCallback) -> std::io::Result<CancelHandle>;
}

/// Stops a registered interval. Dropping the handle cancels as well.
#[must_use = "dropping a CancelHandle cancels the interval"]
pub struct CancelHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl CancelHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop future invocations and release the timer.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ── Real time ───────────────────────────────────────────────────────

/// One OS thread per registration, woken on a fixed cadence.
///
/// Deadlines are computed from the start instant so slow ticks do not
/// accumulate drift. A panicking callback is logged and the interval keeps
/// running.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl IntervalScheduler for ThreadScheduler {
    fn every(&self, interval: Duration, mut callback: TickCallback) -> std::io::Result<CancelHandle> {
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("studybell-tick".into())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if catch_unwind(AssertUnwindSafe(&mut callback)).is_err() {
                                error!("tick callback panicked; interval keeps running");
                            }
                            deadline += interval;
                            let now = Instant::now();
                            if deadline < now {
                                // Fell behind (suspend, long tick): skip missed ticks.
                                deadline = now + interval;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("tick thread stopped");
            })?;

        Ok(CancelHandle::new(move || {
            drop(stop_tx);
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }))
    }
}

// ── Simulated time ──────────────────────────────────────────────────

struct ManualTimer {
    id: u64,
    interval: chrono::Duration,
    next_due: NaiveDateTime,
    callback: Option<TickCallback>,
}

#[derive(Default)]
struct ManualTimers {
    timers: Vec<ManualTimer>,
    next_id: u64,
}

/// Deterministic scheduler over a [`ManualClock`].
///
/// Nothing fires on its own: [`ManualScheduler::advance`] moves the clock
/// forward and runs every callback that falls due, in time order, on the
/// caller's thread.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    timers: Arc<Mutex<ManualTimers>>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            timers: Arc::new(Mutex::new(ManualTimers::default())),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of registrations that have not been cancelled.
    pub fn active_count(&self) -> usize {
        self.lock().timers.len()
    }

    /// Move time forward by `by`, firing due callbacks along the way.
    pub fn advance(&self, by: chrono::Duration) {
        let target = self.clock.now() + by;
        loop {
            let due = {
                let mut inner = self.lock();
                let next = inner
                    .timers
                    .iter_mut()
                    .filter(|t| t.next_due <= target)
                    .min_by_key(|t| (t.next_due, t.id));
                match next {
                    Some(timer) => {
                        let at = timer.next_due;
                        timer.next_due += timer.interval;
                        timer.callback.take().map(|cb| (timer.id, at, cb))
                    }
                    None => None,
                }
            };
            let Some((id, at, mut callback)) = due else {
                break;
            };
            self.clock.set(at);
            callback();
            let mut inner = self.lock();
            if let Some(timer) = inner.timers.iter_mut().find(|t| t.id == id) {
                timer.callback = Some(callback);
            }
        }
        self.clock.set(target);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IntervalScheduler for ManualScheduler {
    fn every(&self, interval: Duration, callback: TickCallback) -> std::io::Result<CancelHandle> {
        let millis = interval.as_millis().clamp(1, i64::MAX as u128) as i64;
        let interval = chrono::Duration::milliseconds(millis);
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.timers.push(ManualTimer {
                id,
                interval,
                next_due: self.clock.now() + interval,
                callback: Some(callback),
            });
            id
        };

        let timers = Arc::downgrade(&self.timers);
        Ok(CancelHandle::new(move || {
            if let Some(timers) = timers.upgrade() {
                let mut inner = timers.lock().unwrap_or_else(PoisonError::into_inner);
                inner.timers.retain(|t| t.id != id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, TickCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn manual_scheduler_fires_once_per_interval() {
        let sched = ManualScheduler::new(ManualClock::new(start()));
        let (count, cb) = counter();
        let _handle = sched.every(Duration::from_secs(1), cb).unwrap();

        sched.advance(chrono::Duration::seconds(10));
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(sched.clock().now(), start() + chrono::Duration::seconds(10));
    }

    #[test]
    fn manual_scheduler_sets_clock_to_due_time() {
        let clock = ManualClock::new(start());
        let sched = ManualScheduler::new(clock.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let c = clock.clone();
        let _handle = sched
            .every(
                Duration::from_secs(30),
                Box::new(move || s.lock().unwrap().push(c.now())),
            )
            .unwrap();
        sched.advance(chrono::Duration::seconds(65));
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                start() + chrono::Duration::seconds(30),
                start() + chrono::Duration::seconds(60)
            ]
        );
    }

    #[test]
    fn cancel_stops_manual_interval() {
        let sched = ManualScheduler::new(ManualClock::new(start()));
        let (count, cb) = counter();
        let handle = sched.every(Duration::from_secs(1), cb).unwrap();
        sched.advance(chrono::Duration::seconds(3));
        handle.cancel();
        assert_eq!(sched.active_count(), 0);
        sched.advance(chrono::Duration::seconds(3));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dropping_handle_cancels() {
        let sched = ManualScheduler::new(ManualClock::new(start()));
        let (count, cb) = counter();
        drop(sched.every(Duration::from_secs(1), cb).unwrap());
        sched.advance(chrono::Duration::seconds(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn thread_scheduler_ticks_and_stops() {
        let (count, cb) = counter();
        let handle = ThreadScheduler.every(Duration::from_millis(10), cb).unwrap();
        thread::sleep(Duration::from_millis(100));
        handle.cancel();
        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel >= 1, "expected at least one tick");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn thread_scheduler_survives_panicking_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = ThreadScheduler
            .every(
                Duration::from_millis(5),
                Box::new(move || {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("first tick blows up");
                    }
                }),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(80));
        handle.cancel();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
