mod session_log;
mod settings;

pub use session_log::{
    LogStats, MemoryLog, SessionFeedback, SessionLog, SessionLogSink, SessionRecord,
    SessionSummary,
};
pub use settings::{AudioSettings, Settings, SpeechSettings, Theme, TimingSettings, UiSettings};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/repcue[-dev]/` based on REPCUE_ENV.
///
/// Set REPCUE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REPCUE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("repcue-dev")
    } else {
        base_dir.join("repcue")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
