mod model;
mod playlist;

pub use model::{
    BeepCode, ExerciseSet, MediaRef, Project, SetBeeps, Step, StepBeeps, WorkoutLibrary,
};
pub use playlist::{ItemKind, ItemSummary, Playlist, PlaylistItem, END_OF_WORKOUT};
