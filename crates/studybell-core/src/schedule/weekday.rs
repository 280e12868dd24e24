use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Weekday labels used by the timetable. The week starts on Monday and
/// ends on Sunday, unlike the Sunday-first index most clocks report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Thứ 2")]
    Monday,
    #[serde(rename = "Thứ 3")]
    Tuesday,
    #[serde(rename = "Thứ 4")]
    Wednesday,
    #[serde(rename = "Thứ 5")]
    Thursday,
    #[serde(rename = "Thứ 6")]
    Friday,
    #[serde(rename = "Thứ 7")]
    Saturday,
    #[serde(rename = "Chủ nhật")]
    Sunday,
}

impl Weekday {
    /// Label order, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Map a Sunday-first day index (Sunday=0 .. Saturday=6) onto the
    /// Monday-first label list: 0 is Sunday, `n` is `ALL[n - 1]`.
    ///
    /// Indices above 6 are reduced modulo 7.
    pub fn from_sunday_index(index: u32) -> Self {
        match index % 7 {
            0 => Weekday::Sunday,
            n => Self::ALL[(n - 1) as usize],
        }
    }

    /// Inverse of [`Weekday::from_sunday_index`].
    pub fn sunday_index(self) -> u32 {
        match self {
            Weekday::Sunday => 0,
            other => other.label_index() as u32 + 1,
        }
    }

    /// Position in the Monday-first label list.
    pub fn label_index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Thứ 2",
            Weekday::Tuesday => "Thứ 3",
            Weekday::Wednesday => "Thứ 4",
            Weekday::Thursday => "Thứ 5",
            Weekday::Friday => "Thứ 6",
            Weekday::Saturday => "Thứ 7",
            Weekday::Sunday => "Chủ nhật",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::from_sunday_index(day.num_days_from_sunday())
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    /// Accepts the timetable labels (`Thứ 2`, `Chủ nhật`, ...) and English
    /// day names or their three-letter abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        let lower = needle.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|day| {
                day.label().to_lowercase() == lower
                    || day.english() == lower
                    || (lower.len() == 3 && day.english().starts_with(&lower))
            })
            .ok_or_else(|| ValidationError::InvalidWeekday(needle.to_string()))
    }
}
