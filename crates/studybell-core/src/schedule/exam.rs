use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Days-left threshold under which an upcoming exam is flagged urgent.
pub const URGENT_WITHIN_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamTag {
    #[serde(rename = "Giữa kỳ")]
    Midterm,
    #[serde(rename = "Cuối kỳ")]
    Final,
    #[serde(rename = "Quiz")]
    Quiz,
    #[serde(rename = "Thuyết trình")]
    Presentation,
    #[serde(rename = "Deadline")]
    Deadline,
    #[serde(rename = "Khác")]
    Other,
}

impl ExamTag {
    pub const ALL: [ExamTag; 6] = [
        ExamTag::Midterm,
        ExamTag::Final,
        ExamTag::Quiz,
        ExamTag::Presentation,
        ExamTag::Deadline,
        ExamTag::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExamTag::Midterm => "Giữa kỳ",
            ExamTag::Final => "Cuối kỳ",
            ExamTag::Quiz => "Quiz",
            ExamTag::Presentation => "Thuyết trình",
            ExamTag::Deadline => "Deadline",
            ExamTag::Other => "Khác",
        }
    }
}

impl fmt::Display for ExamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExamTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let alias = match lower.as_str() {
            "midterm" => Some(ExamTag::Midterm),
            "final" => Some(ExamTag::Final),
            "presentation" => Some(ExamTag::Presentation),
            "other" => Some(ExamTag::Other),
            _ => None,
        };
        alias
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|tag| tag.label().to_lowercase() == lower)
            })
            .ok_or_else(|| ValidationError::InvalidTag(s.trim().to_string()))
    }
}

/// A one-off exam or deadline. Not watched by the reminder engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamEntry {
    pub id: String,
    pub subject: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tag: Option<ExamTag>,
}

impl ExamEntry {
    /// Whole days from `today` until the exam; negative once it has passed.
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.date - today).num_days()
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.days_left(today) < 0
    }

    pub fn is_urgent(&self, today: NaiveDate) -> bool {
        (0..=URGENT_WITHIN_DAYS).contains(&self.days_left(today))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExamEntry {
    pub subject: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub tag: Option<ExamTag>,
}

impl NewExamEntry {
    /// # Errors
    /// Returns an error if the subject is blank.
    pub fn into_entry(self) -> Result<ExamEntry, ValidationError> {
        let subject = self.subject.trim().to_string();
        if subject.is_empty() {
            return Err(ValidationError::EmptyField("subject".into()));
        }
        Ok(ExamEntry {
            id: uuid::Uuid::new_v4().to_string(),
            subject,
            date: self.date,
            description: self.description.filter(|d| !d.trim().is_empty()),
            tag: self.tag,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamSort {
    Subject,
    DateAsc,
    DateDesc,
    /// Upcoming exams soonest first, then past exams most recent first.
    #[default]
    DaysLeft,
}

impl FromStr for ExamSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(ExamSort::Subject),
            "date-asc" => Ok(ExamSort::DateAsc),
            "date-desc" => Ok(ExamSort::DateDesc),
            "days-left" => Ok(ExamSort::DaysLeft),
            other => Err(ValidationError::InvalidValue {
                field: "sort".into(),
                message: format!("unknown sort order '{other}'"),
            }),
        }
    }
}

pub fn sort_exams(exams: &mut [ExamEntry], sort: ExamSort, today: NaiveDate) {
    match sort {
        ExamSort::Subject => exams.sort_by(|a, b| a.subject.cmp(&b.subject)),
        ExamSort::DateAsc => exams.sort_by_key(|e| e.date),
        ExamSort::DateDesc => exams.sort_by(|a, b| b.date.cmp(&a.date)),
        ExamSort::DaysLeft => exams.sort_by(|a, b| {
            match (a.is_past(today), b.is_past(today)) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.date.cmp(&b.date),
                (true, true) => b.date.cmp(&a.date),
            }
        }),
    }
}
