//! Audio output using cpal and the core tone mixer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use repcue_core::SharedMixer;
use tracing::{debug, error};

/// Default output device rendering a [`SharedMixer`].
pub struct AudioOutput {
    mixer: SharedMixer,
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
}

impl AudioOutput {
    pub fn open() -> Result<Self, String> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| "No audio output device available".to_string())?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get default output config: {}", e))?;

        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());
        let mixer = SharedMixer::new(sample_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let config = config.into();
                let render = mixer.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            render.render(data, channels);
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| format!("Failed to build audio stream: {}", e))?
            }
            cpal::SampleFormat::I16 => {
                let config = config.into();
                let render = mixer.clone();
                let mut temp_buffer: Vec<f32> = vec![0.0; 4096];
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            if temp_buffer.len() < data.len() {
                                temp_buffer.resize(data.len(), 0.0);
                            }
                            let frames = &mut temp_buffer[..data.len()];
                            render.render(frames, channels);
                            for (out, &f) in data.iter_mut().zip(frames.iter()) {
                                *out = (f * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            }
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| format!("Failed to build audio stream: {}", e))?
            }
            _ => {
                return Err(format!(
                    "Unsupported sample format: {:?}",
                    config.sample_format()
                ));
            }
        };

        stream
            .play()
            .map_err(|e| format!("Failed to play audio stream: {}", e))?;

        debug!(sample_rate, channels, "Audio stream started");

        Ok(Self {
            mixer,
            _stream: stream,
        })
    }

    /// Handle for scheduling tones on this output.
    pub fn mixer(&self) -> SharedMixer {
        self.mixer.clone()
    }
}
