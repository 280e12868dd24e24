pub mod alarm;
pub mod config;
pub mod exam;
pub mod export;
pub mod schedule;
pub mod user;
pub mod watch;

use studybell_core::storage::{data_dir, Config, Database};
use studybell_core::{ToneSynthesizer, WavFileBackend};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// The logged-in user, or an error telling how to log in.
pub fn require_user(db: &Database) -> CliResult<String> {
    db.current_user()?
        .ok_or_else(|| "not logged in; run `studybell user login <name>`".into())
}

/// Synthesizer writing to the configured WAV path.
pub fn build_synth(config: &Config) -> CliResult<ToneSynthesizer> {
    let path = config.alarm_output_path(&data_dir()?);
    let backend = WavFileBackend::new(path, config.alarm.sample_rate)
        .with_player(config.alarm.player.clone());
    Ok(ToneSynthesizer::new(Box::new(backend)).with_volume(config.alarm.volume))
}
