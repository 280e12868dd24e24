use tracing::warn;

use super::Database;
use crate::reminder::ScheduleSource;
use crate::schedule::ScheduleEntry;

/// Reads one user's timetable from the database on every tick, so edits
/// made by other processes are picked up without restarting the loop.
///
/// A failed read reuses the last snapshot that loaded.
pub struct UserScheduleSource {
    db: Database,
    username: String,
    last_good: Vec<ScheduleEntry>,
}

impl UserScheduleSource {
    pub fn new(db: Database, username: impl Into<String>) -> Self {
        Self {
            db,
            username: username.into(),
            last_good: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl ScheduleSource for UserScheduleSource {
    fn snapshot(&mut self) -> Vec<ScheduleEntry> {
        match self.db.list_schedules(&self.username) {
            Ok(entries) => self.last_good = entries,
            Err(e) => warn!(
                username = %self.username,
                error = %e,
                "schedule reload failed; using last snapshot"
            ),
        }
        self.last_good.clone()
    }
}
