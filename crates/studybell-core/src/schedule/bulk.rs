//! Bulk text entry: one class per line, `Subject - Day - Start - End`.

use super::{NewScheduleEntry, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number in the input.
    pub line: usize,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkParse {
    pub accepted: Vec<NewScheduleEntry>,
    pub rejected: Vec<RejectedLine>,
}

/// Parse bulk timetable text. Blank lines are ignored.
///
/// Fields beyond the fourth are ignored. Times are kept as typed.
pub fn parse_bulk(text: &str) -> BulkParse {
    let mut out = BulkParse::default();
    for (idx, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = raw.split('-').map(str::trim).collect();
        let reject = |reason: String| RejectedLine {
            line: idx + 1,
            text: raw.to_string(),
            reason,
        };
        if parts.len() < 4 {
            out.rejected
                .push(reject("expected 'Subject - Day - Start - End'".into()));
            continue;
        }
        if parts[0].is_empty() {
            out.rejected.push(reject("subject is empty".into()));
            continue;
        }
        match parts[1].parse::<Weekday>() {
            Ok(day) => out.accepted.push(NewScheduleEntry {
                subject: parts[0].to_string(),
                day,
                start_time: parts[2].to_string(),
                end_time: parts[3].to_string(),
            }),
            Err(e) => out.rejected.push(reject(e.to_string())),
        }
    }
    out
}
