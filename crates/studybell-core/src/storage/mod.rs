mod config;
pub mod database;
mod source;

pub use config::{
    AlarmConfig, Config, ExtractionConfig, NotificationsConfig, RemindersConfig, API_KEY_ENV,
};
pub use database::Database;
pub use source::UserScheduleSource;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/studybell[-dev]/` based on STUDYBELL_ENV.
///
/// Set STUDYBELL_ENV=dev to use the development data directory, or
/// STUDYBELL_HOME to use an arbitrary directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYBELL_HOME").filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYBELL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studybell-dev")
            } else {
                base_dir.join("studybell")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
