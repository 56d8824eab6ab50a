use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, ValidationError};

/// Treat absent and blank ids the same way.
fn cue_id(id: &Option<String>) -> Option<&str> {
    id.as_deref().map(str::trim).filter(|id| !id.is_empty())
}

/// A named beep pattern that steps and sets refer to by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeepCode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub pattern: String,
}

/// Cue references of a single step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepBeeps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_from_sec: Option<f64>,
}

impl StepBeeps {
    pub fn on_start(&self) -> Option<&str> {
        cue_id(&self.on_start)
    }

    pub fn on_end(&self) -> Option<&str> {
        cue_id(&self.on_end)
    }

    /// Interval cue id and period, only when both are usable.
    pub fn interval(&self) -> Option<(&str, f64)> {
        let every = self.interval_sec.filter(|sec| *sec > 0.0)?;
        Some((cue_id(&self.interval)?, every))
    }

    /// Countdown cue id and window length, only when both are usable.
    pub fn countdown(&self) -> Option<(&str, f64)> {
        let from = self.countdown_from_sec.filter(|sec| *sec > 0.0)?;
        Some((cue_id(&self.countdown)?, from))
    }
}

/// Cue references of a set; fired on its first and last executed step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBeeps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_end: Option<String>,
}

impl SetBeeps {
    pub fn on_start(&self) -> Option<&str> {
        cue_id(&self.on_start)
    }

    pub fn on_end(&self) -> Option<&str> {
        cue_id(&self.on_end)
    }
}

/// Demonstration media attached to a step (animated GIF in practice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_duration_sec: Option<f64>,
    #[serde(default)]
    pub r#loop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub duration_sec: f64,
    #[serde(default)]
    pub beep: StepBeeps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

impl Step {
    /// Instructions worth reading aloud.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSet {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_rounds")]
    pub rounds: i64,
    #[serde(default)]
    pub rest_between_rounds_sec: f64,
    #[serde(default)]
    pub step_ids: Vec<String>,
    #[serde(default)]
    pub beep: SetBeeps,
}

fn default_rounds() -> i64 {
    1
}

impl ExerciseSet {
    /// Rounds actually executed; a set always runs at least once.
    pub fn effective_rounds(&self) -> u32 {
        u32::try_from(self.rounds.max(1)).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exercise_set_ids: Vec<String>,
}

/// Every workout definition the player can see, keyed by id.
///
/// Field names follow the persisted application state document, so unknown
/// top-level keys (settings, logs, media assets) are ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLibrary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub beep_codes: HashMap<String, BeepCode>,
    #[serde(default)]
    pub projects: HashMap<String, Project>,
    #[serde(default)]
    pub exercise_sets: HashMap<String, ExerciseSet>,
    #[serde(default)]
    pub exercise_steps: HashMap<String, Step>,
}

fn default_schema_version() -> u32 {
    1
}

impl WorkoutLibrary {
    /// Read a library document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a library document.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let content = std::fs::read_to_string(path).map_err(|source| LibraryError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LibraryError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn project(&self, id: &str) -> Result<&Project, LibraryError> {
        self.projects
            .get(id)
            .ok_or_else(|| LibraryError::ProjectNotFound(id.to_string()))
    }

    /// Pattern text of a beep code, `None` when the id no longer resolves.
    pub fn beep_pattern(&self, id: &str) -> Option<&str> {
        self.beep_codes.get(id).map(|code| code.pattern.as_str())
    }

    /// All pattern texts keyed by beep code id.
    pub fn beep_patterns(&self) -> HashMap<String, String> {
        self.beep_codes
            .iter()
            .map(|(id, code)| (id.clone(), code.pattern.clone()))
            .collect()
    }

    /// Report values the playlist builder will have to clamp.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut problems = Vec::new();

        let mut sets: Vec<&ExerciseSet> = self.exercise_sets.values().collect();
        sets.sort_by(|a, b| a.id.cmp(&b.id));
        for set in sets {
            if set.rounds < 1 {
                problems.push(ValidationError::InvalidRounds {
                    set_id: set.id.clone(),
                    rounds: set.rounds,
                });
            }
            if set.rest_between_rounds_sec < 0.0 {
                problems.push(ValidationError::InvalidValue {
                    field: format!("exerciseSets.{}.restBetweenRoundsSec", set.id),
                    message: "must not be negative".into(),
                });
            }
        }

        let mut steps: Vec<&Step> = self.exercise_steps.values().collect();
        steps.sort_by(|a, b| a.id.cmp(&b.id));
        for step in steps {
            if step.duration_sec < 0.0 {
                problems.push(ValidationError::InvalidValue {
                    field: format!("exerciseSteps.{}.durationSec", step.id),
                    message: "must not be negative".into(),
                });
            }
        }

        problems
    }
}
