//! Software tone mixer.
//!
//! Renders scheduled tones into interleaved `f32` frames. The number of
//! frames rendered so far is the audio clock, so the clock only advances as
//! fast as the output device consumes samples.

use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::tone::{AudioBackend, AudioTime, ScheduledTone};

/// Queued voices kept while the device is not rendering; the oldest go first.
pub const MAX_VOICES: usize = 256;

#[derive(Debug, Clone)]
pub struct ToneMixer {
    sample_rate: u32,
    frames: u64,
    volume: f64,
    voices: Vec<ScheduledTone>,
}

impl ToneMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames: 0,
            volume: 1.0,
            voices: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn now(&self) -> AudioTime {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Voices that have not reached their stop time yet.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Queue a tone. A tone whose start already passed begins immediately.
    pub fn enqueue(&mut self, tone: ScheduledTone) {
        let now = self.now();
        let tone = if tone.start < now {
            tone.shifted_to(now)
        } else {
            tone
        };
        if self.voices.len() >= MAX_VOICES {
            warn!(queued = self.voices.len(), "tone queue full, dropping oldest voice");
            self.voices.remove(0);
        }
        self.voices.push(tone);
    }

    /// Fill `out` with interleaved frames of `channels` samples each.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let rate = self.sample_rate as f64;

        for frame in out.chunks_mut(channels) {
            let t = self.frames as f64 / rate;
            let mut sample = 0.0;
            for voice in &self.voices {
                if t < voice.start || t >= voice.stop_at {
                    continue;
                }
                let gain = voice.envelope().gain_at(t);
                if gain > 0.0 {
                    sample += (TAU * voice.frequency_hz * (t - voice.start)).sin() * gain;
                }
            }
            frame.fill((sample * self.volume).clamp(-1.0, 1.0) as f32);
            self.frames += 1;
        }

        let now = self.now();
        self.voices.retain(|voice| voice.stop_at > now);
    }
}

/// [`ToneMixer`] shared between the scheduler and an audio callback thread.
#[derive(Debug, Clone)]
pub struct SharedMixer(Arc<Mutex<ToneMixer>>);

impl SharedMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self(Arc::new(Mutex::new(ToneMixer::new(sample_rate))))
    }

    pub fn lock(&self) -> MutexGuard<'_, ToneMixer> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, out: &mut [f32], channels: usize) {
        self.lock().render(out, channels);
    }
}

impl AudioBackend for SharedMixer {
    fn now(&self) -> Option<AudioTime> {
        Some(self.lock().now())
    }

    fn enqueue(&mut self, tone: ScheduledTone) {
        self.lock().enqueue(tone);
    }

    fn set_volume(&mut self, volume: f64) {
        self.lock().set_volume(volume);
    }
}
