use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use studybell_core::extraction::GeminiExtractor;
use studybell_core::schedule::{parse_bulk, NewScheduleEntry, ScheduleEntry, Weekday};
use studybell_core::storage::{Config, Database};

use super::{require_user, CliResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Add one weekly class
    Add {
        subject: String,
        /// Weekday label ("Thứ 2" .. "Chủ nhật") or English name
        #[arg(long)]
        day: Weekday,
        /// Start time, HH:mm
        #[arg(long)]
        start: String,
        /// End time, HH:mm
        #[arg(long)]
        end: String,
    },
    /// Add many classes, one `Subject - Day - Start - End` per line
    Bulk {
        /// Read from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List the timetable
    List {
        /// Only this weekday
        #[arg(long)]
        day: Option<Weekday>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a class by id
    Delete { id: String },
    /// Read a timetable photo and add the classes found
    ImportImage {
        image: PathBuf,
        /// Class name to look for in the photo
        #[arg(long, default_value = "")]
        class: String,
        /// Print the classes without saving them
        #[arg(long)]
        dry_run: bool,
    },
}

fn print_entries(entries: &[ScheduleEntry]) {
    for e in entries {
        let flag = if e.is_well_formed() { "" } else { "  (invalid time)" };
        println!(
            "{}  {:<9} {}-{}  {}{flag}",
            e.id,
            e.day.label(),
            e.start_time,
            e.end_time,
            e.subject
        );
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

fn save_all(db: &mut Database, username: &str, new: Vec<NewScheduleEntry>) -> CliResult<Vec<ScheduleEntry>> {
    let entries = new
        .into_iter()
        .map(NewScheduleEntry::into_entry)
        .collect::<Result<Vec<_>, _>>()?;
    db.add_schedules(username, &entries)?;
    Ok(entries)
}

pub fn run(action: ScheduleAction) -> CliResult {
    let mut db = Database::open()?;
    let username = require_user(&db)?;

    match action {
        ScheduleAction::Add {
            subject,
            day,
            start,
            end,
        } => {
            let entry = NewScheduleEntry {
                subject,
                day,
                start_time: start,
                end_time: end,
            }
            .into_entry()?;
            if !entry.is_well_formed() {
                return Err(format!(
                    "invalid times '{}'-'{}': expected HH:mm with start before end",
                    entry.start_time, entry.end_time
                )
                .into());
            }
            db.add_schedule(&username, &entry)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        ScheduleAction::Bulk { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let parsed = parse_bulk(&text);
            for r in &parsed.rejected {
                eprintln!("line {}: {} ({})", r.line, r.text.trim(), r.reason);
            }
            let saved = save_all(&mut db, &username, parsed.accepted)?;
            print_entries(&saved);
            println!("added {} classes, skipped {} lines", saved.len(), parsed.rejected.len());
        }
        ScheduleAction::List { day, json } => {
            let mut entries = db.list_schedules(&username)?;
            if let Some(day) = day {
                entries.retain(|e| e.day == day);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                entries.sort_by(|a, b| {
                    (a.day.label_index(), &a.start_time).cmp(&(b.day.label_index(), &b.start_time))
                });
                print_entries(&entries);
            }
        }
        ScheduleAction::Delete { id } => {
            if !db.delete_schedule(&username, &id)? {
                return Err(format!("no class with id {id}").into());
            }
            println!("deleted {id}");
        }
        ScheduleAction::ImportImage {
            image,
            class,
            dry_run,
        } => {
            let config = Config::load()?;
            let extractor = GeminiExtractor::from_config(&config.extraction)?;
            let bytes = std::fs::read(&image)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let found = runtime.block_on(extractor.extract(&bytes, mime_for(&image), &class))?;
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                let saved = save_all(&mut db, &username, found)?;
                print_entries(&saved);
                println!("added {} classes", saved.len());
            }
        }
    }
    Ok(())
}
