mod mixer;
pub mod pattern;
mod tone;

pub use mixer::{SharedMixer, ToneMixer};
pub use pattern::{CompiledPattern, PatternCompiler, ToneEvent, ToneKind};
pub use tone::{
    AudioBackend, AudioTime, Envelope, NullAudio, ScheduledTone, ToneScheduler, RAMP_SEC,
    STOP_TAIL_SEC,
};
