use std::path::PathBuf;

use chrono::Local;
use clap::Subcommand;
use studybell_core::export::{write_ics, DEFAULT_ICS_FILENAME};
use studybell_core::storage::Database;

use super::{require_user, CliResult};

#[derive(Subcommand)]
pub enum ExportAction {
    /// Write the timetable and exams as an iCalendar file
    Ics {
        /// Output path
        #[arg(long, default_value = DEFAULT_ICS_FILENAME)]
        out: PathBuf,
    },
}

pub fn run(action: ExportAction) -> CliResult {
    let db = Database::open()?;
    let username = require_user(&db)?;

    match action {
        ExportAction::Ics { out } => {
            let user = db.load_user(&username)?;
            write_ics(&out, &user, Local::now().date_naive())?;
            println!("{}", out.display());
        }
    }
    Ok(())
}
