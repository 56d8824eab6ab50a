//! TOML-based player settings.
//!
//! Stores user preferences including:
//! - Master volume and vibration
//! - Spoken announcements and the speech program
//! - Delays between announcement, cue and clock phases
//! - Appearance
//!
//! Settings are stored at `~/.config/repcue/settings.toml`. A playback
//! session works on a clone; edits take effect the next time one is handed in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Master gain, 0.0 to 1.0.
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Announce each item by name.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Also read step instructions after the name.
    #[serde(default)]
    pub read_instructions: bool,
    /// External program invoked with the text as its last argument.
    #[serde(default = "default_speech_command")]
    pub command: String,
}

/// Delays in seconds between the phases of entering an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Announcement finished -> start cue.
    #[serde(default = "default_delay")]
    pub delay_tts_beep: f64,
    /// Step name -> step instructions.
    #[serde(default = "default_delay")]
    pub delay_name_instructions: f64,
    /// Start cue finished -> clock starts.
    #[serde(default = "default_delay")]
    pub delay_beep_start: f64,
    /// How long before step media pops up on its own.
    #[serde(default)]
    pub auto_popup_media_delay: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub keep_awake: bool,
}

/// Player settings.
///
/// Serialized to/from TOML at `~/.config/repcue/settings.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub ui: UiSettings,
}

fn default_volume() -> f64 {
    0.8
}
fn default_true() -> bool {
    true
}
fn default_delay() -> f64 {
    0.5
}
fn default_speech_command() -> String {
    "espeak".into()
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            vibration_enabled: true,
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            read_instructions: false,
            command: default_speech_command(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            delay_tts_beep: default_delay(),
            delay_name_instructions: default_delay(),
            delay_beep_start: default_delay(),
            auto_popup_media_delay: 0.0,
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            keep_awake: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            speech: SpeechSettings::default(),
            timing: TimingSettings::default(),
            ui: UiSettings::default(),
        }
    }
}

/// Delay value usable for waiting: finite and not negative.
fn usable_delay(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(0.0)
    } else {
        0.0
    }
}

impl TimingSettings {
    pub fn tts_to_cue(&self) -> f64 {
        usable_delay(self.delay_tts_beep)
    }

    pub fn name_to_instructions(&self) -> f64 {
        usable_delay(self.delay_name_instructions)
    }

    pub fn cue_to_clock(&self) -> f64 {
        usable_delay(self.delay_beep_start)
    }
}

impl Settings {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<f64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("'{value}' is not a finite number")))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("settings.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed,
    /// or if the default settings cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let settings = Self::default();
                settings.save_to(path)?;
                Ok(settings)
            }
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a setting as string by dot-separated key, e.g. `timing.delay_tts_beep`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a setting by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated.normalized();
        Ok(())
    }

    /// Volume clamped to 0..=1, delays made finite and non-negative.
    pub fn normalized(mut self) -> Self {
        self.audio.volume = if self.audio.volume.is_finite() {
            self.audio.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        self.timing.delay_tts_beep = usable_delay(self.timing.delay_tts_beep);
        self.timing.delay_name_instructions = usable_delay(self.timing.delay_name_instructions);
        self.timing.delay_beep_start = usable_delay(self.timing.delay_beep_start);
        self.timing.auto_popup_media_delay = usable_delay(self.timing.auto_popup_media_delay);
        self
    }

    /// Load from disk, returning defaults on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                tracing::warn!(error = %e, "using default settings");
                Self::default()
            }
        }
    }
}
