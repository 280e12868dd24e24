use std::sync::{Arc, PoisonError, RwLock};

use crate::schedule::ScheduleEntry;

/// Supplies the schedule the engine evaluates.
///
/// Called once per tick; implementations must return the latest data rather
/// than a copy captured when the engine started.
pub trait ScheduleSource: Send {
    fn snapshot(&mut self) -> Vec<ScheduleEntry>;
}

/// In-memory schedule shared between the engine and whoever edits it.
#[derive(Debug, Clone, Default)]
pub struct SharedSchedule {
    entries: Arc<RwLock<Vec<ScheduleEntry>>>,
}

impl SharedSchedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn replace(&self, entries: Vec<ScheduleEntry>) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    pub fn push(&self, entry: ScheduleEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Returns true if an entry with `id` was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScheduleSource for SharedSchedule {
    fn snapshot(&mut self) -> Vec<ScheduleEntry> {
        self.entries()
    }
}

/// A fixed list.
impl ScheduleSource for Vec<ScheduleEntry> {
    fn snapshot(&mut self) -> Vec<ScheduleEntry> {
        self.clone()
    }
}
