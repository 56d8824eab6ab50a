//! Workout playback.
//!
//! [`PlaybackSession`] walks a [`Playlist`](crate::workout::Playlist): it
//! announces each item, fires beep cues on the audio clock and counts the
//! step down on the wall clock. Hosts drive it with
//! [`PlaybackSession::on_frame`] and observe it through [`UiRefresh`].

pub mod cues;
mod events;
mod session;

pub use events::{CueMoment, PlayerEvent, PlayerSnapshot, PlayerStatus, UiRefresh};
pub use session::{
    PlaybackSession, PlayerIo, PREV_RESTART_THRESHOLD_SEC, SET_END_CUE_OFFSET_SEC,
};
