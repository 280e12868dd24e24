use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use studybell_core::schedule::{sort_exams, ExamEntry, ExamSort, ExamTag, NewExamEntry};
use studybell_core::storage::Database;

use super::{require_user, CliResult};

#[derive(Subcommand)]
pub enum ExamAction {
    /// Add an exam or deadline
    Add {
        subject: String,
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        /// One of: Giữa kỳ, Cuối kỳ, Quiz, Thuyết trình, Deadline, Khác
        #[arg(long)]
        tag: Option<ExamTag>,
    },
    /// List exams with days remaining
    List {
        /// subject | date-asc | date-desc | days-left
        #[arg(long, default_value = "days-left")]
        sort: ExamSort,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an exam by id
    Delete { id: String },
}

#[derive(Serialize)]
struct ExamRow<'a> {
    #[serde(flatten)]
    exam: &'a ExamEntry,
    days_left: i64,
    urgent: bool,
    past: bool,
}

fn countdown(days_left: i64) -> String {
    match days_left {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("in {d} days"),
    }
}

pub fn run(action: ExamAction) -> CliResult {
    let db = Database::open()?;
    let username = require_user(&db)?;

    match action {
        ExamAction::Add {
            subject,
            date,
            description,
            tag,
        } => {
            let exam = NewExamEntry {
                subject,
                date,
                description,
                tag,
            }
            .into_entry()?;
            db.add_exam(&username, &exam)?;
            println!("{}", serde_json::to_string_pretty(&exam)?);
        }
        ExamAction::List { sort, json } => {
            let today = Local::now().date_naive();
            let mut exams = db.list_exams(&username)?;
            sort_exams(&mut exams, sort, today);
            let rows: Vec<ExamRow<'_>> = exams
                .iter()
                .map(|exam| ExamRow {
                    exam,
                    days_left: exam.days_left(today),
                    urgent: exam.is_urgent(today),
                    past: exam.is_past(today),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    let marker = if row.urgent { "!" } else { " " };
                    let tag = row.exam.tag.map(ExamTag::label).unwrap_or("");
                    println!(
                        "{marker} {}  {}  {:<14} {}  {}",
                        row.exam.id,
                        row.exam.date,
                        countdown(row.days_left),
                        row.exam.subject,
                        tag
                    );
                }
            }
        }
        ExamAction::Delete { id } => {
            if !db.delete_exam(&username, &id)? {
                return Err(format!("no exam with id {id}").into());
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}
