use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ledger::DedupKey;
use crate::schedule::ScheduleEntry;

/// How far ahead of the start time the pre-alert fires.
pub const PRE_ALERT_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Class starts in [`PRE_ALERT_MINUTES`] minutes.
    PreAlert,
    /// Class starts now.
    Start,
}

/// One reminder, produced by the engine and handed straight to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub entry_id: String,
    pub subject: String,
    /// Same string as the de-duplication key.
    pub dedup_tag: String,
    pub fired_at: NaiveDateTime,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, entry: &ScheduleEntry, key: &DedupKey, fired_at: NaiveDateTime) -> Self {
        let (title, message) = match kind {
            AlertKind::Start => (
                "ĐÃ ĐẾN GIỜ HỌC!".to_string(),
                format!("Môn học: {} bắt đầu ngay bây giờ.", entry.subject),
            ),
            AlertKind::PreAlert => (
                "SẮP ĐẾN GIỜ HỌC".to_string(),
                format!(
                    "Chuẩn bị: {} sẽ bắt đầu trong {} phút.",
                    entry.subject, PRE_ALERT_MINUTES
                ),
            ),
        };
        Self {
            kind,
            title,
            message,
            entry_id: entry.id.clone(),
            subject: entry.subject.clone(),
            dedup_tag: key.to_string(),
            fired_at,
        }
    }
}
