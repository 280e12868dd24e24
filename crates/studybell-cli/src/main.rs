use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod notifier;

#[derive(Parser)]
#[command(name = "studybell", version, about = "Study timetable with class reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account and session
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Weekly timetable
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Exams and deadlines
    Exam {
        #[command(subcommand)]
        action: commands::exam::ExamAction,
    },
    /// Calendar export
    Export {
        #[command(subcommand)]
        action: commands::export::ExportAction,
    },
    /// Alarm sounds
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run class reminders until `q` or end of input
    Watch(commands::watch::WatchArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("STUDYBELL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Schedule { action } => commands::schedule::run(action),
        Commands::Exam { action } => commands::exam::run(action),
        Commands::Export { action } => commands::export::run(action),
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch(args) => commands::watch::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
