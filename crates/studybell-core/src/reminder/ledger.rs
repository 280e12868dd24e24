use std::collections::HashMap;
use std::fmt;

use crate::schedule::ScheduleEntry;

/// Minimum spacing between two alerts for the same key.
pub const DEDUP_WINDOW_MS: i64 = 60_000;

/// Scopes de-duplication to one recurring slot: an entry and its start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub entry_id: String,
    pub start_time: String,
}

impl DedupKey {
    pub fn for_entry(entry: &ScheduleEntry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            start_time: entry.start_time.clone(),
        }
    }
}

/// `<id>-<startTime>`; doubles as the platform-notification tag.
impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entry_id, self.start_time)
    }
}

/// Last-fired timestamps per key.
///
/// Entries are never evicted; the map is bounded by the number of distinct
/// schedule slots seen during the run.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    last_fired: HashMap<DedupKey, i64>,
    window_ms: i64,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::with_window(DEDUP_WINDOW_MS)
    }

    pub fn with_window(window_ms: i64) -> Self {
        Self {
            last_fired: HashMap::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// True if `key` fired less than one window before `now_ms`.
    pub fn is_suppressed(&self, key: &DedupKey, now_ms: i64) -> bool {
        matches!(self.last_fired.get(key), Some(&last) if now_ms - last < self.window_ms)
    }

    pub fn record(&mut self, key: DedupKey, now_ms: i64) {
        self.last_fired.insert(key, now_ms);
    }

    /// Check-and-set: records `now_ms` and returns true unless suppressed.
    pub fn try_claim(&mut self, key: DedupKey, now_ms: i64) -> bool {
        if self.is_suppressed(&key, now_ms) {
            return false;
        }
        self.record(key, now_ms);
        true
    }

    pub fn last_fired(&self, key: &DedupKey) -> Option<i64> {
        self.last_fired.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}
