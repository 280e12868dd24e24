//! # StudyBell Core Library
//!
//! This library provides the core logic for studybell, a weekly study
//! timetable with class reminders. Everything is available through the
//! `studybell` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Reminder Engine**: a wall-clock evaluator that the caller (or an
//!   interval scheduler) invokes once per tick; it compares each class start
//!   time with the current minute and fires pre-alerts and start alerts once
//! - **Alert Dispatcher**: fans each alert out to the active-alert slot, the
//!   alarm player and the platform notifier
//! - **Tone Synthesizer**: renders alarm and UI cues from tone tables
//! - **Storage**: SQLite user data and TOML configuration
//! - **Export / Extraction**: iCalendar output and timetable-photo import
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: the tick evaluator and its de-duplication ledger
//! - [`AlertDispatcher`]: alert fan-out
//! - [`ToneSynthesizer`]: cue playback
//! - [`Database`]: users, schedules, exams and session
//! - [`Config`]: application configuration management

pub mod audio;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod extraction;
pub mod reminder;
pub mod schedule;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use audio::{AlarmStyle, Cue, ToneSynthesizer, WavFileBackend};
pub use clock::{Clock, IntervalScheduler, ManualClock, ManualScheduler, SystemClock, ThreadScheduler};
pub use dispatch::{AlertDispatcher, AlertSlot, NotificationPermission, PlatformNotifier};
pub use error::{CoreError, DatabaseError, ConfigError, ValidationError};
pub use reminder::{AlertEvent, AlertKind, ReminderEngine, RunningEngine, SharedSchedule};
pub use schedule::{ExamEntry, ScheduleEntry, User, Weekday};
pub use storage::{Config, Database, UserScheduleSource};
