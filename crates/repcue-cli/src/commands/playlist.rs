use std::path::PathBuf;

use clap::Args;
use repcue_core::workout::ItemKind;
use repcue_core::{Playlist, WorkoutLibrary};

#[derive(Args)]
pub struct PlaylistArgs {
    /// Workout library JSON file
    pub library: PathBuf,
    /// Project id
    pub project: String,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlaylistArgs) -> Result<(), Box<dyn std::error::Error>> {
    let library = WorkoutLibrary::load(&args.library)?;
    let project = library.project(&args.project)?;
    let playlist = Playlist::build(project, &library);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&playlist.summaries())?);
        return Ok(());
    }

    println!("{} ({} items)", project.name, playlist.len());
    for item in playlist.summaries() {
        let marker = match item.kind {
            ItemKind::Step => "step",
            ItemKind::Rest => "rest",
        };
        println!(
            "{:>3}. {:<4} {:<24} {:>6.0}s  {} round {}/{}",
            item.index + 1,
            marker,
            item.label,
            item.duration_sec,
            item.set_title,
            item.round,
            item.total_rounds,
        );
    }
    println!("total: {}", format_duration(playlist.total_duration_sec()));
    Ok(())
}

/// `h:mm:ss` or `m:ss`.
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
