use std::time::Duration;

use clap::Args;
use repcue_core::audio::{ToneKind, STOP_TAIL_SEC};
use repcue_core::{PatternCompiler, ToneScheduler};

use crate::audio_out::AudioOutput;

#[derive(Args)]
pub struct PatternArgs {
    /// Beep pattern, e.g. "S P(120) S L"
    pub pattern: String,
    /// Play the pattern on the default output device
    #[arg(long)]
    pub play: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PatternArgs) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = PatternCompiler::new();
    let compiled = compiler.compile(&args.pattern);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*compiled)?);
    } else {
        for event in &compiled.events {
            match event.kind {
                ToneKind::Tone => println!(
                    "{:>7.3}s  tone  {:.3}s @ {} Hz",
                    event.start_offset_sec, event.duration_sec, event.frequency_hz
                ),
                ToneKind::SilenceBoundary => println!(
                    "{:>7.3}s  pause {:.3}s",
                    event.start_offset_sec, event.duration_sec
                ),
            }
        }
        println!("duration: {:.3}s", compiled.duration_sec);
    }

    if args.play && !compiled.is_empty() {
        let output = AudioOutput::open()?;
        let mut tones = ToneScheduler::new(Box::new(output.mixer()));
        let length = tones.schedule_in(&args.pattern, 0.05);
        let wait = Duration::try_from_secs_f64(length + STOP_TAIL_SEC + 0.1).unwrap_or_default();
        std::thread::sleep(wait);
    }
    Ok(())
}
