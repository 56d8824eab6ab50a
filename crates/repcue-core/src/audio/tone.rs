//! Tone scheduling on the audio clock.
//!
//! All times here are seconds on the audio backend's own monotonic clock.
//! They are never compared with wall-clock instants.

use tracing::debug;

use super::pattern::{PatternCompiler, ToneKind};

/// Seconds on the audio clock.
pub type AudioTime = f64;

/// Attack and release ramp length.
pub const RAMP_SEC: f64 = 0.01;
/// Oscillators keep running this long after the envelope closes.
pub const STOP_TAIL_SEC: f64 = 0.1;

/// Linear attack/hold/release gain envelope of one tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub start: AudioTime,
    pub end: AudioTime,
}

impl Envelope {
    /// Gain in `0.0..=1.0` at audio time `t`.
    pub fn gain_at(&self, t: AudioTime) -> f64 {
        if t <= self.start || t >= self.end {
            return 0.0;
        }
        let attack = (t - self.start) / RAMP_SEC;
        let release = (self.end - t) / RAMP_SEC;
        attack.min(release).min(1.0)
    }
}

/// One oscillator + gain pair, ready for a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTone {
    pub start: AudioTime,
    pub duration_sec: f64,
    pub frequency_hz: f64,
    pub stop_at: AudioTime,
}

impl ScheduledTone {
    pub fn new(start: AudioTime, duration_sec: f64, frequency_hz: f64) -> Self {
        Self {
            start,
            duration_sec,
            frequency_hz,
            stop_at: start + duration_sec + STOP_TAIL_SEC,
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope {
            start: self.start,
            end: self.start + self.duration_sec,
        }
    }

    /// Same tone moved so that it begins at `now`.
    pub fn shifted_to(&self, now: AudioTime) -> Self {
        Self::new(now, self.duration_sec, self.frequency_hz)
    }
}

/// Audio output as seen by the scheduler.
pub trait AudioBackend {
    /// Current audio clock, `None` when no output is available.
    fn now(&self) -> Option<AudioTime>;
    fn enqueue(&mut self, tone: ScheduledTone);
    /// Master gain, `0.0..=1.0`.
    fn set_volume(&mut self, volume: f64);
}

/// Backend for hosts without audio output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn now(&self) -> Option<AudioTime> {
        None
    }

    fn enqueue(&mut self, _tone: ScheduledTone) {}

    fn set_volume(&mut self, _volume: f64) {}
}

/// Compiles beep patterns and hands their tones to an [`AudioBackend`].
pub struct ToneScheduler {
    backend: Box<dyn AudioBackend>,
    compiler: PatternCompiler,
}

impl ToneScheduler {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            compiler: PatternCompiler::new(),
        }
    }

    /// Scheduler that never makes a sound.
    pub fn silent() -> Self {
        Self::new(Box::new(NullAudio))
    }

    pub fn compiler(&self) -> &PatternCompiler {
        &self.compiler
    }

    pub fn audio_now(&self) -> Option<AudioTime> {
        self.backend.now()
    }

    pub fn is_available(&self) -> bool {
        self.backend.now().is_some()
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.backend.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Pattern length in seconds, whether or not audio is available.
    pub fn duration(&self, pattern: &str) -> f64 {
        self.compiler.duration(pattern)
    }

    /// Schedule every tone of `pattern` relative to `start`.
    ///
    /// Returns the pattern duration, or `0.0` when nothing could be scheduled.
    pub fn schedule(&mut self, pattern: &str, start: AudioTime) -> f64 {
        if !self.is_available() {
            debug!(pattern, "audio unavailable, cue skipped");
            return 0.0;
        }
        let compiled = self.compiler.compile(pattern);
        for event in compiled
            .events
            .iter()
            .filter(|ev| ev.kind == ToneKind::Tone)
        {
            let tone = ScheduledTone::new(
                start + event.start_offset_sec,
                event.duration_sec,
                event.frequency_hz,
            );
            self.backend.enqueue(tone);
        }
        compiled.duration_sec
    }

    /// Schedule `pattern` to begin `delay_sec` from the current audio time.
    pub fn schedule_in(&mut self, pattern: &str, delay_sec: f64) -> f64 {
        match self.audio_now() {
            Some(now) => self.schedule(pattern, now + delay_sec.max(0.0)),
            None => {
                debug!(pattern, "audio unavailable, cue skipped");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        tones: Rc<RefCell<Vec<ScheduledTone>>>,
        volume: Rc<RefCell<f64>>,
    }

    impl AudioBackend for Recorder {
        fn now(&self) -> Option<AudioTime> {
            Some(10.0)
        }
        fn enqueue(&mut self, tone: ScheduledTone) {
            self.tones.borrow_mut().push(tone);
        }
        fn set_volume(&mut self, volume: f64) {
            *self.volume.borrow_mut() = volume;
        }
    }

    #[test]
    fn envelope_ramps_and_holds() {
        let env = Envelope {
            start: 1.0,
            end: 1.5,
        };
        assert_eq!(env.gain_at(0.9), 0.0);
        assert_eq!(env.gain_at(1.0), 0.0);
        assert!((env.gain_at(1.005) - 0.5).abs() < 1e-9);
        assert_eq!(env.gain_at(1.25), 1.0);
        assert!((env.gain_at(1.495) - 0.5).abs() < 1e-9);
        assert_eq!(env.gain_at(1.5), 0.0);
        assert_eq!(env.gain_at(2.0), 0.0);
    }

    #[test]
    fn scheduled_tone_has_safety_tail() {
        let tone = ScheduledTone::new(2.0, 0.12, 880.0);
        assert!((tone.stop_at - 2.22).abs() < 1e-9);
        assert!((tone.envelope().end - 2.12).abs() < 1e-9);
    }

    #[test]
    fn schedule_offsets_events_from_start() {
        let recorder = Recorder::default();
        let mut scheduler = ToneScheduler::new(Box::new(recorder.clone()));
        let duration = scheduler.schedule("S P(120) S", 10.5);
        assert!((duration - 0.36).abs() < 1e-9);

        let tones = recorder.tones.borrow();
        assert_eq!(tones.len(), 2);
        assert!((tones[0].start - 10.5).abs() < 1e-9);
        assert!((tones[1].start - 10.74).abs() < 1e-9);
    }

    #[test]
    fn schedule_in_uses_audio_clock() {
        let recorder = Recorder::default();
        let mut scheduler = ToneScheduler::new(Box::new(recorder.clone()));
        scheduler.schedule_in("L", 0.5);
        assert!((recorder.tones.borrow()[0].start - 10.5).abs() < 1e-9);
    }

    #[test]
    fn unavailable_audio_schedules_nothing() {
        let mut scheduler = ToneScheduler::silent();
        assert!(!scheduler.is_available());
        assert_eq!(scheduler.schedule("L L", 0.0), 0.0);
        // Duration is still known for display purposes.
        assert!((scheduler.duration("L L") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn volume_is_clamped() {
        let recorder = Recorder::default();
        let mut scheduler = ToneScheduler::new(Box::new(recorder.clone()));
        scheduler.set_volume(1.7);
        assert_eq!(*recorder.volume.borrow(), 1.0);
        scheduler.set_volume(-0.2);
        assert_eq!(*recorder.volume.borrow(), 0.0);
    }
}
