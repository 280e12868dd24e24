//! Calendar export.

mod ics;

use std::path::Path;

use chrono::{NaiveDate, Utc};
use tracing::info;

pub use ics::{generate_ics, next_occurrence, EXAM_END, EXAM_START, PRODID, UID_DOMAIN};

use crate::error::Result;
use crate::schedule::User;

/// File name used when no output path is given.
pub const DEFAULT_ICS_FILENAME: &str = "MySchedule.ics";

/// Write `user`'s schedules and exams to `path` as an iCalendar file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_ics(path: &Path, user: &User, today: NaiveDate) -> Result<()> {
    let doc = generate_ics(&user.schedules, &user.exams, today, Utc::now());
    std::fs::write(path, doc)?;
    info!(
        path = %path.display(),
        schedules = user.schedules.len(),
        exams = user.exams.len(),
        "calendar exported"
    );
    Ok(())
}
