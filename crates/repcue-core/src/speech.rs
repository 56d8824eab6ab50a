//! Spoken announcements.

/// Text-to-speech as seen by the player.
pub trait SpeechAnnouncer {
    /// Start speaking `text`, replacing anything still being spoken.
    ///
    /// Returns `false` when speech is unavailable; the caller then treats the
    /// announcement as already finished.
    fn speak(&mut self, text: &str) -> bool;

    /// Whether the last utterance is still playing.
    fn is_speaking(&mut self) -> bool;

    /// Cut off the current utterance, if any.
    fn cancel(&mut self) {}
}

/// Announcer for hosts without speech output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAnnouncer;

impl SpeechAnnouncer for SilentAnnouncer {
    fn speak(&mut self, _text: &str) -> bool {
        false
    }

    fn is_speaking(&mut self) -> bool {
        false
    }
}
