//! Flattening a project into the ordered list of things the player runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{ExerciseSet, Project, Step, WorkoutLibrary};

/// Label used when announcing what follows the last item.
pub const END_OF_WORKOUT: &str = "End of workout";

/// One playable unit. `round_index` is zero-based.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistItem {
    Step {
        step: Arc<Step>,
        set: Arc<ExerciseSet>,
        round_index: u32,
        total_rounds: u32,
        is_first_step_in_set: bool,
        is_last_step_in_set: bool,
    },
    Rest {
        duration_sec: f64,
        set: Arc<ExerciseSet>,
        round_index: u32,
        total_rounds: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Step,
    Rest,
}

/// Serializable view of a playlist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub index: usize,
    pub kind: ItemKind,
    pub label: String,
    pub set_title: String,
    pub duration_sec: f64,
    pub round: u32,
    pub total_rounds: u32,
}

impl PlaylistItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            PlaylistItem::Step { .. } => ItemKind::Step,
            PlaylistItem::Rest { .. } => ItemKind::Rest,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, PlaylistItem::Rest { .. })
    }

    pub fn step(&self) -> Option<&Step> {
        match self {
            PlaylistItem::Step { step, .. } => Some(step.as_ref()),
            PlaylistItem::Rest { .. } => None,
        }
    }

    pub fn set(&self) -> &ExerciseSet {
        match self {
            PlaylistItem::Step { set, .. } | PlaylistItem::Rest { set, .. } => set,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PlaylistItem::Step { step, .. } => &step.name,
            PlaylistItem::Rest { .. } => "Rest",
        }
    }

    /// Clock length of the item; negative definitions count as zero.
    pub fn duration_sec(&self) -> f64 {
        let raw = match self {
            PlaylistItem::Step { step, .. } => step.duration_sec,
            PlaylistItem::Rest { duration_sec, .. } => *duration_sec,
        };
        raw.max(0.0)
    }

    /// One-based round number.
    pub fn round(&self) -> u32 {
        match self {
            PlaylistItem::Step { round_index, .. } | PlaylistItem::Rest { round_index, .. } => {
                round_index + 1
            }
        }
    }

    pub fn total_rounds(&self) -> u32 {
        match self {
            PlaylistItem::Step { total_rounds, .. } | PlaylistItem::Rest { total_rounds, .. } => {
                *total_rounds
            }
        }
    }

    pub fn summary(&self, index: usize) -> ItemSummary {
        ItemSummary {
            index,
            kind: self.kind(),
            label: self.label().to_string(),
            set_title: self.set().title.clone(),
            duration_sec: self.duration_sec(),
            round: self.round(),
            total_rounds: self.total_rounds(),
        }
    }
}

/// Immutable, ordered execution sequence of a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    items: Vec<PlaylistItem>,
}

impl Playlist {
    /// Expand `project` using the sets and steps in `library`.
    ///
    /// Set and step ids that do not resolve are skipped. First/last flags are
    /// assigned over the steps that do resolve.
    pub fn build(project: &Project, library: &WorkoutLibrary) -> Self {
        let mut items = Vec::new();

        for set_id in &project.exercise_set_ids {
            let Some(set) = library.exercise_sets.get(set_id) else {
                debug!(set_id = %set_id, "skipping missing set");
                continue;
            };

            let steps: Vec<Arc<Step>> = set
                .step_ids
                .iter()
                .filter_map(|step_id| {
                    let step = library.exercise_steps.get(step_id);
                    if step.is_none() {
                        debug!(set_id = %set_id, step_id = %step_id, "skipping missing step");
                    }
                    step.cloned().map(Arc::new)
                })
                .collect();
            if steps.is_empty() {
                continue;
            }

            let set = Arc::new(set.clone());
            let total_rounds = set.effective_rounds();
            let last_step = steps.len() - 1;

            for round_index in 0..total_rounds {
                let final_round = round_index + 1 == total_rounds;
                for (i, step) in steps.iter().enumerate() {
                    items.push(PlaylistItem::Step {
                        step: Arc::clone(step),
                        set: Arc::clone(&set),
                        round_index,
                        total_rounds,
                        is_first_step_in_set: round_index == 0 && i == 0,
                        is_last_step_in_set: final_round && i == last_step,
                    });
                }
                if !final_round && set.rest_between_rounds_sec > 0.0 {
                    items.push(PlaylistItem::Rest {
                        duration_sec: set.rest_between_rounds_sec,
                        set: Arc::clone(&set),
                        round_index,
                        total_rounds,
                    });
                }
            }
        }

        Self { items }
    }

    pub fn from_items(items: Vec<PlaylistItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.items.iter()
    }

    /// Label of the item at `index`, or the end-of-workout marker past the end.
    pub fn label_at(&self, index: usize) -> &str {
        self.items
            .get(index)
            .map(PlaylistItem::label)
            .unwrap_or(END_OF_WORKOUT)
    }

    pub fn total_duration_sec(&self) -> f64 {
        self.items.iter().map(PlaylistItem::duration_sec).sum()
    }

    pub fn summaries(&self) -> Vec<ItemSummary> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| item.summary(i))
            .collect()
    }
}
