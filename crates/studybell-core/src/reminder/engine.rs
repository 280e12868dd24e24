//! Reminder engine.
//!
//! Like the rest of the core, the engine has no thread of its own. Each call
//! to [`ReminderEngine::tick`] takes the latest schedule snapshot, compares
//! every entry against the clock at minute granularity, and dispatches at
//! most one alert per entry.
//!
//! ```text
//! source.snapshot() -> per entry: ledger gate -> weekday gate -> HH:mm match
//!                                  -> ledger.record -> AlertEvent -> dispatcher
//! ```
//!
//! Two independent guards prevent duplicates: the exact-minute comparison
//! and the 60 s ledger window.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, error, info};

use super::alert::{AlertEvent, AlertKind, PRE_ALERT_MINUTES};
use super::ledger::{DedupKey, DedupLedger};
use super::source::ScheduleSource;
use crate::audio::AlarmStyle;
use crate::clock::{CancelHandle, Clock, IntervalScheduler};
use crate::dispatch::{AlertDispatcher, AlertSlot};
use crate::error::ValidationError;
use crate::schedule::{ClockTime, ScheduleEntry, Weekday};

/// Default tick cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on the cadence; beyond a minute the exact-minute match can be
/// skipped entirely.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Alarm style selector shared with the caller; read on every dispatch.
#[derive(Debug, Clone, Default)]
pub struct AlarmStyleHandle(Arc<Mutex<AlarmStyle>>);

impl AlarmStyleHandle {
    pub fn new(style: AlarmStyle) -> Self {
        Self(Arc::new(Mutex::new(style)))
    }

    pub fn get(&self) -> AlarmStyle {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, style: AlarmStyle) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = style;
    }
}

pub struct ReminderEngine {
    clock: Arc<dyn Clock>,
    source: Box<dyn ScheduleSource>,
    ledger: DedupLedger,
    dispatcher: AlertDispatcher,
    alarm_style: AlarmStyleHandle,
}

impl ReminderEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        source: Box<dyn ScheduleSource>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            clock,
            source,
            ledger: DedupLedger::new(),
            dispatcher,
            alarm_style: AlarmStyleHandle::default(),
        }
    }

    /// Use an existing ledger instead of a fresh one.
    pub fn with_ledger(mut self, ledger: DedupLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_alarm_style(mut self, style: AlarmStyleHandle) -> Self {
        self.alarm_style = style;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> DedupLedger {
        self.ledger
    }

    pub fn alarm_style(&self) -> AlarmStyleHandle {
        self.alarm_style.clone()
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut AlertDispatcher {
        &mut self.dispatcher
    }

    pub fn alert_slot(&self) -> AlertSlot {
        self.dispatcher.slot()
    }

    // ── Evaluation ───────────────────────────────────────────────────

    /// Evaluate every entry once. Returns the alerts emitted this tick, in
    /// schedule order. Never fails: entries that cannot be evaluated are
    /// logged and skipped.
    pub fn tick(&mut self) -> Vec<AlertEvent> {
        let entries = self.source.snapshot();
        if entries.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let now_ms = self.clock.now_ms();
        let today = Weekday::from_sunday_index(now.weekday().num_days_from_sunday());
        let current = ClockTime::from_time(now.time());
        let style = self.alarm_style.get();

        let mut fired = Vec::new();
        for entry in &entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let event = self.evaluate_entry(entry, now, now_ms, today, current)?;
                self.dispatcher.dispatch(&event, style);
                Some(event)
            }));
            match outcome {
                Ok(Some(event)) => fired.push(event),
                Ok(None) => {}
                Err(_) => error!(entry_id = %entry.id, "entry evaluation panicked; skipped"),
            }
        }
        fired
    }

    fn evaluate_entry(
        &mut self,
        entry: &ScheduleEntry,
        now: NaiveDateTime,
        now_ms: i64,
        today: Weekday,
        current: ClockTime,
    ) -> Option<AlertEvent> {
        let key = DedupKey::for_entry(entry);
        if self.ledger.is_suppressed(&key, now_ms) {
            return None;
        }
        if entry.day != today {
            return None;
        }
        let kind = match classify(entry, current) {
            Ok(kind) => kind?,
            Err(e) => {
                debug!(entry_id = %entry.id, error = %e, "skipping entry");
                return None;
            }
        };

        self.ledger.record(key.clone(), now_ms);
        let event = AlertEvent::new(kind, entry, &key, now);
        info!(entry_id = %entry.id, kind = ?kind, subject = %entry.subject, "reminder fired");
        Some(event)
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// Ask for notification permission if undecided, then register
    /// [`ReminderEngine::tick`] on `scheduler`.
    ///
    /// `interval` is clamped to [`MAX_TICK_INTERVAL`].
    ///
    /// # Errors
    /// Returns an error if the scheduler cannot create its timer.
    pub fn start(
        mut self,
        scheduler: &dyn IntervalScheduler,
        interval: Duration,
    ) -> std::io::Result<RunningEngine> {
        self.dispatcher.init_permission();
        let slot = self.alert_slot();
        let engine = Arc::new(Mutex::new(self));
        let tick_engine = Arc::clone(&engine);
        let handle = scheduler.every(
            interval.min(MAX_TICK_INTERVAL),
            Box::new(move || {
                tick_engine
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .tick();
            }),
        )?;
        Ok(RunningEngine {
            engine,
            slot,
            handle: Some(handle),
        })
    }
}

/// Decide which alert, if any, `entry` triggers at `current`.
fn classify(entry: &ScheduleEntry, current: ClockTime) -> Result<Option<AlertKind>, ValidationError> {
    let start = entry.start()?;
    let kind = if current == start {
        Some(AlertKind::Start)
    } else if current == start.minus_minutes(PRE_ALERT_MINUTES) {
        Some(AlertKind::PreAlert)
    } else {
        None
    };
    Ok(kind)
}

/// An engine registered on a scheduler. Stopping or dropping it cancels the
/// interval.
pub struct RunningEngine {
    engine: Arc<Mutex<ReminderEngine>>,
    slot: AlertSlot,
    handle: Option<CancelHandle>,
}

impl RunningEngine {
    /// The active-alert slot, for rendering and dismissal.
    pub fn slot(&self) -> AlertSlot {
        self.slot.clone()
    }

    pub fn dismiss(&self) {
        self.slot.dismiss();
    }

    /// Run `f` against the engine between ticks.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut ReminderEngine) -> R) -> R {
        f(&mut self.engine.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Cancel the interval and hand the engine back.
    ///
    /// Returns `None` only if the scheduler still holds the tick closure.
    pub fn stop(self) -> Option<ReminderEngine> {
        let RunningEngine { engine, handle, .. } = self;
        if let Some(handle) = handle {
            handle.cancel();
        }
        Arc::try_unwrap(engine)
            .ok()
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualScheduler};
    use crate::dispatch::{AlarmPlayer, NotificationPermission, PlatformNotification, PlatformNotifier};
    use crate::error::NotifyError;
    use crate::reminder::SharedSchedule;
    use crate::testing::{entry, monday_at, RecordingNotifier, RecordingPlayer};

    struct Fixture {
        clock: ManualClock,
        schedule: SharedSchedule,
        notifier: RecordingNotifier,
        player: RecordingPlayer,
        engine: ReminderEngine,
    }

    fn fixture(entries: Vec<ScheduleEntry>, start: NaiveDateTime) -> Fixture {
        let clock = ManualClock::new(start);
        let schedule = SharedSchedule::new(entries);
        let notifier = RecordingNotifier::granted();
        let player = RecordingPlayer::default();
        let dispatcher = AlertDispatcher::new(Box::new(player.clone()), Box::new(notifier.clone()));
        let engine = ReminderEngine::new(
            Arc::new(clock.clone()),
            Box::new(schedule.clone()),
            dispatcher,
        );
        Fixture {
            clock,
            schedule,
            notifier,
            player,
            engine,
        }
    }

    fn math() -> ScheduleEntry {
        entry("a", "Math", Weekday::Monday, "07:00", "07:45")
    }

    /// Panics whenever it is asked to show the notification tagged `tag`.
    struct PanicOnTag {
        tag: &'static str,
        inner: RecordingNotifier,
    }

    impl PlatformNotifier for PanicOnTag {
        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Granted
        }

        fn request_permission(&mut self) -> NotificationPermission {
            NotificationPermission::Granted
        }

        fn notify(&mut self, n: &PlatformNotification) -> Result<(), NotifyError> {
            if n.tag == self.tag {
                panic!("notifier crashed on {}", n.tag);
            }
            self.inner.notify(n)
        }
    }

    struct PanickingPlayer;

    impl AlarmPlayer for PanickingPlayer {
        fn play_alarm(&mut self, _style: AlarmStyle) {
            panic!("audio device gone");
        }
    }

    #[test]
    fn panicking_player_does_not_cost_the_notifications() {
        let notifier = RecordingNotifier::granted();
        let dispatcher = AlertDispatcher::new(Box::new(PanickingPlayer), Box::new(notifier.clone()));
        let clock = ManualClock::new(monday_at(7, 0, 59));
        let mut engine = ReminderEngine::new(
            Arc::new(clock),
            Box::new(SharedSchedule::new(vec![
                math(),
                entry("b", "Physics", Weekday::Monday, "07:00", "07:45"),
            ])),
            dispatcher,
        );

        let fired = engine.tick();
        assert_eq!(fired.len(), 2);
        let tags: Vec<String> = notifier.sent().into_iter().map(|n| n.tag).collect();
        assert_eq!(tags, vec!["a-07:00", "b-07:00"]);
        assert_eq!(engine.alert_slot().current().map(|e| e.entry_id), Some("b".to_string()));
    }

    #[test]
    fn panic_in_one_entry_does_not_abort_the_tick() {
        let recorded = RecordingNotifier::granted();
        let notifier = PanicOnTag {
            tag: "a-07:00",
            inner: recorded.clone(),
        };
        let player = RecordingPlayer::default();
        let dispatcher = AlertDispatcher::new(Box::new(player.clone()), Box::new(notifier));
        let mut engine = ReminderEngine::new(
            Arc::new(ManualClock::new(monday_at(7, 0, 59))),
            Box::new(SharedSchedule::new(vec![
                math(),
                entry("b", "Physics", Weekday::Monday, "07:00", "07:45"),
            ])),
            dispatcher,
        );

        let fired = engine.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].entry_id, "b");
        let tags: Vec<String> = recorded.sent().into_iter().map(|n| n.tag).collect();
        assert_eq!(tags, vec!["b-07:00"]);
        assert_eq!(player.plays().len(), 2);
    }

    #[test]
    fn start_alert_only_on_exact_minute() {
        let mut f = fixture(vec![math()], monday_at(6, 59, 59));
        assert!(f.engine.tick().is_empty());

        f.clock.set(monday_at(7, 0, 0));
        let fired = f.engine.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, AlertKind::Start);

        f.clock.set(monday_at(7, 1, 30));
        assert!(f.engine.tick().is_empty());
    }

    #[test]
    fn pre_alert_five_minutes_before() {
        let mut f = fixture(vec![math()], monday_at(6, 55, 0));
        let fired = f.engine.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, AlertKind::PreAlert);
        assert!(fired[0].message.contains("Math"));
        assert_eq!(fired[0].dedup_tag, "a-07:00");
    }

    #[test]
    fn other_weekday_never_fires() {
        let wednesday = entry("w", "Math", Weekday::Wednesday, "07:00", "07:45");
        let mut f = fixture(vec![wednesday], monday_at(6, 55, 0));
        assert!(f.engine.tick().is_empty());
        f.clock.set(monday_at(7, 0, 0));
        assert!(f.engine.tick().is_empty());
        assert!(f.notifier.sent().is_empty());
    }

    #[test]
    fn rapid_ticks_inside_the_minute_fire_once() {
        let mut f = fixture(vec![math()], monday_at(7, 0, 0));
        let mut total = 0;
        for _ in 0..60 {
            total += f.engine.tick().len();
            f.clock.advance(chrono::Duration::seconds(1));
        }
        assert_eq!(total, 1);
        assert_eq!(f.player.plays().len(), 1);
    }

    #[test]
    fn ledger_alone_blocks_refire_within_window() {
        // Rewind into the same minute: only the ledger stands between the
        // entry and a second alert.
        let mut f = fixture(vec![math()], monday_at(7, 0, 40));
        assert_eq!(f.engine.tick().len(), 1);
        f.clock.set(monday_at(7, 0, 10));
        assert!(f.engine.tick().is_empty());
    }

    #[test]
    fn two_entries_same_slot_both_notify() {
        let a = math();
        let b = entry("b", "Physics", Weekday::Monday, "07:00", "07:45");
        let mut f = fixture(vec![a, b], monday_at(7, 0, 0));
        let fired = f.engine.tick();
        assert_eq!(fired.len(), 2);

        let tags: Vec<_> = f.notifier.sent().into_iter().map(|n| n.tag).collect();
        assert_eq!(tags, ["a-07:00", "b-07:00"]);
        assert_eq!(f.player.plays().len(), 2);
        let shown = f.engine.alert_slot().current().unwrap();
        assert_eq!(shown.entry_id, "b");
    }

    #[test]
    fn malformed_sibling_does_not_block_valid_entry() {
        let broken = entry("x", "Broken", Weekday::Monday, "invalid", "07:45");
        let mut f = fixture(vec![broken.clone(), math()], monday_at(7, 0, 0));
        let fired = f.engine.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].entry_id, "a");
        assert!(f.engine.ledger().last_fired(&DedupKey::for_entry(&broken)).is_none());
    }

    #[test]
    fn reads_latest_schedule_each_tick() {
        let mut f = fixture(Vec::new(), monday_at(7, 0, 0));
        assert!(f.engine.tick().is_empty());
        f.schedule.push(math());
        assert_eq!(f.engine.tick().len(), 1);
    }

    #[test]
    fn uses_current_alarm_style() {
        let mut f = fixture(vec![math()], monday_at(6, 55, 0));
        let style = f.engine.alarm_style();
        style.set(AlarmStyle::Intense);
        f.engine.tick();
        assert_eq!(f.player.plays(), vec![AlarmStyle::Intense]);
    }

    #[test]
    fn injected_ledger_is_respected() {
        let mut ledger = DedupLedger::new();
        ledger.record(DedupKey::for_entry(&math()), monday_at(7, 0, 0).and_utc().timestamp_millis());
        let f = fixture(vec![math()], monday_at(7, 0, 30));
        let mut engine = f.engine.with_ledger(ledger);
        assert!(engine.tick().is_empty());
    }

    #[test]
    fn start_requests_permission_and_stop_cancels() {
        let clock = ManualClock::new(monday_at(6, 54, 0));
        let scheduler = ManualScheduler::new(clock.clone());
        let notifier = RecordingNotifier::undecided(NotificationPermission::Granted);
        let player = RecordingPlayer::default();
        let engine = ReminderEngine::new(
            Arc::new(clock.clone()),
            Box::new(vec![math()]),
            AlertDispatcher::new(Box::new(player.clone()), Box::new(notifier.clone())),
        );

        let running = engine.start(&scheduler, Duration::from_secs(1)).unwrap();
        assert_eq!(notifier.request_count(), 1);
        scheduler.advance(chrono::Duration::minutes(10));
        assert_eq!(player.plays().len(), 2);

        let engine = running.stop().expect("engine handed back");
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(engine.ledger().len(), 1);
    }
}
