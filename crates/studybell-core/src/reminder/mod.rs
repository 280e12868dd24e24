mod alert;
mod engine;
mod ledger;
mod source;

pub use alert::{AlertEvent, AlertKind, PRE_ALERT_MINUTES};
pub use engine::{
    AlarmStyleHandle, ReminderEngine, RunningEngine, DEFAULT_TICK_INTERVAL, MAX_TICK_INTERVAL,
};
pub use ledger::{DedupKey, DedupLedger, DEDUP_WINDOW_MS};
pub use source::{ScheduleSource, SharedSchedule};
