use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use repcue_core::player::{PlayerEvent, PlayerSnapshot, PlayerStatus};
use repcue_core::{
    DirMediaStore, ManualClock, MediaStore, PlaybackSession, PlayerIo, Playlist, SessionFeedback,
    SessionLog, Settings, SilentAnnouncer, SpeechAnnouncer, ToneScheduler, WallClock,
    WorkoutLibrary,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::playlist::format_duration;
use crate::audio_out::AudioOutput;
use crate::speech::CommandAnnouncer;

/// Display refresh period of the terminal player.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Simulated frame length of a dry run.
const DRY_RUN_FRAME: Duration = Duration::from_millis(250);

const CONTROLS_HELP: &str = "controls: p pause/resume, n next, b back, q quit (then enter)";

#[derive(Args)]
pub struct PlayArgs {
    /// Workout library JSON file
    pub library: PathBuf,
    /// Project id
    pub project: String,
    /// Run through the workout instantly, without sound or speech
    #[arg(long)]
    pub dry_run: bool,
    /// Clock speed multiplier
    #[arg(long, default_value = "1.0")]
    pub speed: f64,
    /// Directory step media paths are relative to (default: the library's directory)
    #[arg(long)]
    pub media_dir: Option<PathBuf>,
    /// Skip the rating prompt and don't record the session
    #[arg(long)]
    pub no_record: bool,
}

/// Wall clock running `speed` times faster than real time.
struct ScaledClock {
    origin: Instant,
    speed: f64,
}

impl ScaledClock {
    fn new(speed: f64) -> Self {
        Self {
            origin: Instant::now(),
            speed,
        }
    }

    fn scale(&self, real: Duration) -> Duration {
        Duration::try_from_secs_f64(real.as_secs_f64() * self.speed).unwrap_or_default()
    }
}

impl WallClock for ScaledClock {
    fn now(&self) -> Instant {
        self.origin + self.scale(self.origin.elapsed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Toggle,
    Next,
    Prev,
    Quit,
}

impl Control {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "p" | "pause" => Some(Control::Toggle),
            "n" | "next" => Some(Control::Next),
            "b" | "back" => Some(Control::Prev),
            "q" | "quit" => Some(Control::Quit),
            _ => None,
        }
    }

    fn apply(self, session: &mut PlaybackSession) {
        match self {
            Control::Toggle if session.status() == PlayerStatus::Running => session.pause(),
            Control::Toggle => session.play(),
            Control::Next => session.next(),
            Control::Prev => session.prev(),
            Control::Quit => session.stop(),
        }
    }
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(format!("speed must be a positive number, got {}", args.speed).into());
    }

    let library = WorkoutLibrary::load(&args.library)?;
    for issue in library.validate() {
        warn!(%issue, "library value will be clamped");
    }
    let settings = Settings::load_or_default();

    if args.dry_run {
        return dry_run(&args.project, &library, settings);
    }

    let audio = match AudioOutput::open() {
        Ok(output) => Some(output),
        Err(e) => {
            warn!(error = %e, "audio output unavailable, cues are silent");
            None
        }
    };
    let tones = audio
        .as_ref()
        .map(|output| ToneScheduler::new(Box::new(output.mixer())))
        .unwrap_or_else(ToneScheduler::silent);
    let speech: Box<dyn SpeechAnnouncer> = if settings.speech.enabled {
        Box::new(CommandAnnouncer::new(&settings.speech.command))
    } else {
        Box::new(SilentAnnouncer)
    };
    let io = PlayerIo::new(
        Box::new(ScaledClock::new(args.speed)),
        speech,
        tones,
        Box::new(render),
    );
    let mut session = PlaybackSession::for_project(&args.project, &library, settings, io)?;

    let media_root = args.media_dir.clone().unwrap_or_else(|| {
        args.library
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    check_media(&DirMediaStore::new(media_root), session.playlist());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let no_record = args.no_record;
    let result = runtime.block_on(async {
        let (tx, mut lines) = mpsc::unbounded_channel();
        tokio::spawn(read_lines(tx));

        let completed = drive(&mut session, &mut lines).await;
        if completed && !no_record {
            record(&mut session, &mut lines).await?;
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    });
    // The stdin reader blocks until the next line; don't wait for it.
    runtime.shutdown_background();
    result
}

/// Play through on a simulated clock and print what would happen.
fn dry_run(
    project_id: &str,
    library: &WorkoutLibrary,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let clock = ManualClock::new();
    let io = PlayerIo::new(
        Box::new(clock.clone()),
        Box::new(SilentAnnouncer),
        ToneScheduler::silent(),
        Box::new(render),
    );
    let mut session = PlaybackSession::for_project(project_id, library, settings, io)?;

    let playlist = session.playlist();
    let budget_sec = playlist.total_duration_sec() + 10.0 * playlist.len() as f64;
    let limit = (budget_sec / DRY_RUN_FRAME.as_secs_f64()).ceil() as usize + 100;

    session.play();
    let mut frames = 0;
    while session.status() == PlayerStatus::Running {
        if frames >= limit {
            return Err("dry run did not finish".into());
        }
        clock.advance(DRY_RUN_FRAME);
        session.on_frame();
        frames += 1;
    }
    Ok(())
}

/// Refresh the session until it completes (true) or is stopped (false).
async fn drive(session: &mut PlaybackSession, lines: &mut UnboundedReceiver<String>) -> bool {
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stdin_open = true;

    println!("{CONTROLS_HELP}");
    session.play();
    loop {
        match session.status() {
            PlayerStatus::Completed => return true,
            PlayerStatus::Idle => return false,
            PlayerStatus::Running | PlayerStatus::Paused => {}
        }
        tokio::select! {
            _ = frames.tick() => session.on_frame(),
            line = lines.recv(), if stdin_open => match line {
                Some(line) => match Control::parse(&line) {
                    Some(control) => control.apply(session),
                    None => println!("{CONTROLS_HELP}"),
                },
                None => {
                    debug!("stdin closed, controls disabled");
                    stdin_open = false;
                }
            },
        }
    }
}

async fn read_lines(tx: UnboundedSender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Ask for ratings and store the completed session.
async fn record(
    session: &mut PlaybackSession,
    lines: &mut UnboundedReceiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nHow did it go? (enter to skip)");
    let rpe = ask_rating(lines, "Effort, RPE 1-10:", 1, 10).await;
    let pain_score = ask_rating(lines, "Pain 0-10:", 0, 10).await;
    let pain_location = if pain_score.unwrap_or(0) > 0 {
        ask(lines, "Where?").await.filter(|answer| !answer.is_empty())
    } else {
        None
    };

    let mut log = SessionLog::open()?;
    let feedback = SessionFeedback {
        rpe,
        pain_score,
        pain_location,
    };
    let record = session.submit_feedback(feedback, &mut log)?;
    info!(id = %record.id, "session saved");
    println!("saved session {}", record.id);
    Ok(())
}

async fn ask(lines: &mut UnboundedReceiver<String>, prompt: &str) -> Option<String> {
    print!("{prompt} ");
    let _ = std::io::stdout().flush();
    lines.recv().await.map(|line| line.trim().to_string())
}

async fn ask_rating(
    lines: &mut UnboundedReceiver<String>,
    prompt: &str,
    min: u8,
    max: u8,
) -> Option<u8> {
    loop {
        let answer = ask(lines, prompt).await?;
        match parse_rating(&answer, min, max) {
            Ok(value) => return value,
            Err(message) => println!("{message}"),
        }
    }
}

/// Blank means "skip".
fn parse_rating(text: &str, min: u8, max: u8) -> Result<Option<u8>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<u8>() {
        Ok(value) if (min..=max).contains(&value) => Ok(Some(value)),
        _ => Err(format!("enter a number from {min} to {max}")),
    }
}

/// Warn about step media that won't show.
fn check_media(store: &dyn MediaStore, playlist: &Playlist) {
    let mut seen = HashSet::new();
    let mut missing = 0;
    for step in playlist.iter().filter_map(|item| item.step()) {
        let Some(media) = &step.media else {
            continue;
        };
        if !seen.insert(media.path.as_str()) {
            continue;
        }
        if store.load(&media.path).is_none() {
            missing += 1;
            warn!(step = %step.id, path = %media.path, "step media not found");
        }
    }
    debug!(checked = seen.len(), missing, "media checked");
}

fn render(snapshot: &PlayerSnapshot, event: &PlayerEvent) {
    let mut out = std::io::stdout().lock();
    let _ = match event {
        PlayerEvent::ItemEntered { index, label, .. } => writeln!(
            out,
            "\n[{}/{}] {} ({}, round {}/{})",
            index + 1,
            snapshot.total,
            label,
            format_duration(snapshot.duration_sec),
            snapshot.round,
            snapshot.total_rounds
        ),
        PlayerEvent::Announced { text, .. } => writeln!(out, "  \"{text}\""),
        PlayerEvent::CueFired {
            moment, beep_id, ..
        } => {
            debug!(?moment, beep_id = %beep_id, "cue");
            Ok(())
        }
        PlayerEvent::DisplayTick { .. } => {
            write!(
                out,
                "\r  {}  next: {}   ",
                snapshot.remaining_display(),
                snapshot.next_label
            )
            .and_then(|_| out.flush())
        }
        PlayerEvent::Paused { .. } => writeln!(out, "\n  paused"),
        PlayerEvent::Resumed { .. } => writeln!(out, "  resumed"),
        PlayerEvent::Stopped { .. } => writeln!(out, "\nstopped"),
        PlayerEvent::Completed { duration_sec } => writeln!(
            out,
            "\nworkout complete in {}",
            format_duration(*duration_sec)
        ),
        _ => Ok(()),
    };
}
