//! Timetable model: weekly recurring classes and one-off exams.
//!
//! Schedule entries keep their start/end times as the raw strings the user
//! typed. Malformed times are tolerated here and handled by whoever reads the
//! entry (the reminder engine skips them, the calendar export falls back).

mod bulk;
mod exam;
mod time;
mod weekday;

use serde::{Deserialize, Serialize};

pub use bulk::{parse_bulk, BulkParse, RejectedLine};
pub use exam::{sort_exams, ExamEntry, ExamSort, ExamTag, NewExamEntry};
pub use time::ClockTime;
pub use weekday::Weekday;

use crate::error::ValidationError;

/// A weekly recurring class.
///
/// Never mutated in place: edits are a delete followed by a fresh insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub subject: String,
    pub day: Weekday,
    /// `HH:mm`, unvalidated.
    pub start_time: String,
    /// `HH:mm`, unvalidated.
    pub end_time: String,
}

impl ScheduleEntry {
    pub fn start(&self) -> Result<ClockTime, ValidationError> {
        ClockTime::parse(&self.start_time)
    }

    pub fn end(&self) -> Result<ClockTime, ValidationError> {
        ClockTime::parse(&self.end_time)
    }

    /// Both times parse and the class starts before it ends.
    pub fn is_well_formed(&self) -> bool {
        matches!((self.start(), self.end()), (Ok(s), Ok(e)) if s < e)
    }
}

/// A schedule entry before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleEntry {
    pub subject: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
}

impl NewScheduleEntry {
    /// Assign a fresh UUID v4 identifier.
    ///
    /// # Errors
    /// Returns an error if the subject is blank.
    pub fn into_entry(self) -> Result<ScheduleEntry, ValidationError> {
        let subject = self.subject.trim().to_string();
        if subject.is_empty() {
            return Err(ValidationError::EmptyField("subject".into()));
        }
        Ok(ScheduleEntry {
            id: uuid::Uuid::new_v4().to_string(),
            subject,
            day: self.day,
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
        })
    }
}

/// A user together with everything they own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub exams: Vec<ExamEntry>,
}
