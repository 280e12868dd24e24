use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::schedule::{ClockTime, ExamEntry, ScheduleEntry, Weekday};

pub const PRODID: &str = "-//StudyBell//Schedule//VI";
pub const UID_DOMAIN: &str = "studybell.app";
/// Exams have no time of day; they are exported as this window.
pub const EXAM_START: (u32, u32) = (8, 0);
pub const EXAM_END: (u32, u32) = (10, 0);

const MAX_LINE_OCTETS: usize = 75;

/// Serialize schedules and exams as an iCalendar document.
///
/// Each schedule entry becomes one weekly-recurring event starting on the
/// next occurrence of its weekday on or after `today`. Each exam becomes one
/// single event. Event times are floating local times; `stamp` is written
/// as `DTSTAMP` in UTC.
pub fn generate_ics(
    schedules: &[ScheduleEntry],
    exams: &[ExamEntry],
    today: NaiveDate,
    stamp: DateTime<Utc>,
) -> String {
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let mut doc = Document::default();
    doc.line("BEGIN:VCALENDAR");
    doc.line("VERSION:2.0");
    doc.line(&format!("PRODID:{PRODID}"));
    doc.line("CALSCALE:GREGORIAN");
    doc.line("METHOD:PUBLISH");

    for entry in schedules {
        let date = next_occurrence(today, entry.day);
        let start = lenient_time(&entry.start_time).unwrap_or(NaiveTime::MIN);
        let end = lenient_time(&entry.end_time).unwrap_or(start);

        doc.line("BEGIN:VEVENT");
        doc.line(&format!("UID:{}@{UID_DOMAIN}", entry.id));
        doc.line(&format!("DTSTAMP:{dtstamp}"));
        doc.line(&format!("DTSTART:{}", local(date.and_time(start))));
        doc.line(&format!("DTEND:{}", local(date.and_time(end))));
        doc.line(&format!("SUMMARY:{}", escape(&entry.subject)));
        doc.line("RRULE:FREQ=WEEKLY");
        doc.line("END:VEVENT");
    }

    for exam in exams {
        let at = |(h, m): (u32, u32)| exam.date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN));

        doc.line("BEGIN:VEVENT");
        doc.line(&format!("UID:{}@{UID_DOMAIN}", exam.id));
        doc.line(&format!("DTSTAMP:{dtstamp}"));
        doc.line(&format!("DTSTART:{}", local(at(EXAM_START))));
        doc.line(&format!("DTEND:{}", local(at(EXAM_END))));
        doc.line(&format!("SUMMARY:{}", escape(&format!("Lịch Thi: {}", exam.subject))));
        doc.line(&format!(
            "DESCRIPTION:{}",
            escape(exam.description.as_deref().unwrap_or(""))
        ));
        if let Some(tag) = exam.tag {
            doc.line(&format!("CATEGORIES:{}", escape(tag.label())));
        }
        doc.line("END:VEVENT");
    }

    doc.line("END:VCALENDAR");
    doc.out
}

/// First date on or after `from` that falls on `day`.
pub fn next_occurrence(from: NaiveDate, day: Weekday) -> NaiveDate {
    let current = from.weekday().num_days_from_sunday();
    let target = day.sunday_index();
    let distance = (target + 7 - current) % 7;
    from + chrono::Duration::days(i64::from(distance))
}

/// `HH:mm` or the looser `H:mm`; anything else is `None`.
fn lenient_time(raw: &str) -> Option<NaiveTime> {
    if let Ok(t) = ClockTime::parse(raw) {
        return Some(t.to_naive_time());
    }
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

fn local(at: NaiveDateTime) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// TEXT value escaping.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

#[derive(Default)]
struct Document {
    out: String,
}

impl Document {
    /// Append a content line, folded at 75 octets without splitting a
    /// UTF-8 sequence.
    fn line(&mut self, content: &str) {
        let mut width = 0;
        for c in content.chars() {
            let len = c.len_utf8();
            if width + len > MAX_LINE_OCTETS {
                self.out.push_str("\r\n ");
                width = 1;
            }
            self.out.push(c);
            width += len;
        }
        self.out.push_str("\r\n");
    }
}
