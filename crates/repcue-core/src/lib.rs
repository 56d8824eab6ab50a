//! # RepCue Core Library
//!
//! This library provides the core logic of the RepCue workout player. Every
//! operation is available through the standalone `repcue` CLI binary; any
//! other front end is a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Workout**: Beep codes, steps, sets and projects, and the playlist
//!   builder that flattens a project into playable items
//! - **Audio**: Beep pattern compiler, tone scheduler and a software mixer
//!   that runs on its own audio clock
//! - **Player**: A wall-clock-based playback state machine that requires the
//!   caller to invoke `on_frame()` from its refresh loop
//! - **Storage**: TOML settings and the SQLite log of completed sessions
//!
//! ## Key Components
//!
//! - [`PlaybackSession`]: Core playback state machine
//! - [`Playlist`]: Ordered items of a project
//! - [`PatternCompiler`]: Beep pattern text to tone events
//! - [`Settings`]: Application configuration management
//! - [`SessionLog`]: Completed session persistence

pub mod audio;
pub mod clock;
pub mod error;
pub mod media;
pub mod player;
pub mod speech;
pub mod storage;
pub mod workout;

pub use audio::{
    AudioBackend, CompiledPattern, PatternCompiler, SharedMixer, ToneMixer, ToneScheduler,
};
pub use clock::{ManualClock, SystemClock, WallClock};
pub use error::{ConfigError, CoreError, DatabaseError, LibraryError, ValidationError};
pub use media::{DirMediaStore, MediaStore};
pub use player::{
    PlaybackSession, PlayerEvent, PlayerIo, PlayerSnapshot, PlayerStatus, UiRefresh,
};
pub use speech::{SilentAnnouncer, SpeechAnnouncer};
pub use storage::{
    SessionFeedback, SessionLog, SessionLogSink, SessionRecord, SessionSummary, Settings,
};
pub use workout::{Playlist, PlaylistItem, Project, WorkoutLibrary};
