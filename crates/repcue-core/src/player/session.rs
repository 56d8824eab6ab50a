//! Playback session state machine.
//!
//! The session runs on the host's refresh loop: the host calls
//! [`PlaybackSession::on_frame`] for every display frame and the session
//! resumes whatever it is waiting for. There are no threads and no timers.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Completed -> Running (restart from the first item)
//! Running | Paused -> Idle (stop, position kept)
//! ```
//!
//! Entering an item runs a short sequence (announce, start cues, start the
//! clock) with waits in between. Each wait is stored as the single pending
//! continuation together with the sequence epoch it was started under; when
//! the position changes the epoch moves on and stale continuations are
//! dropped the next time they come due.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use super::cues;
use super::events::{CueMoment, PlayerEvent, PlayerSnapshot, PlayerStatus, UiRefresh};
use crate::audio::ToneScheduler;
use crate::clock::{SystemClock, WallClock};
use crate::error::{CoreError, LibraryError};
use crate::speech::{SilentAnnouncer, SpeechAnnouncer};
use crate::storage::{SessionFeedback, SessionLogSink, SessionRecord, SessionSummary, Settings};
use crate::workout::{Playlist, PlaylistItem, WorkoutLibrary};

/// The set end cue sounds this long after the step end cue.
pub const SET_END_CUE_OFFSET_SEC: f64 = 0.5;
/// `prev()` restarts the current item once this much of it has played.
pub const PREV_RESTART_THRESHOLD_SEC: f64 = 3.0;
/// Longest entry-sequence wait; larger configured delays are clamped.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Collaborators a session talks to.
pub struct PlayerIo {
    pub clock: Box<dyn WallClock>,
    pub speech: Box<dyn SpeechAnnouncer>,
    pub tones: ToneScheduler,
    pub ui: Box<dyn UiRefresh>,
}

impl PlayerIo {
    pub fn new(
        clock: Box<dyn WallClock>,
        speech: Box<dyn SpeechAnnouncer>,
        tones: ToneScheduler,
        ui: Box<dyn UiRefresh>,
    ) -> Self {
        Self {
            clock,
            speech,
            tones,
            ui,
        }
    }

    /// System clock, no speech, no sound, no display.
    pub fn headless() -> Self {
        Self::new(
            Box::new(SystemClock),
            Box::new(SilentAnnouncer),
            ToneScheduler::silent(),
            Box::new(|_: &PlayerSnapshot, _: &PlayerEvent| {}),
        )
    }
}

/// Remaining phases of the item-entry sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    AfterName { spoke: bool },
    Instructions { spoke: bool },
    AfterAnnouncement { spoke: bool },
    StartCues,
    AfterCues { fired: bool },
    StartClock,
}

/// What the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Speech { epoch: u64, then: Stage },
    Until { epoch: u64, at: Instant, then: Stage },
    Tick,
}

pub struct PlaybackSession {
    project_id: String,
    playlist: Playlist,
    beep_patterns: HashMap<String, String>,
    settings: Settings,
    io: PlayerIo,

    status: PlayerStatus,
    current_index: usize,
    elapsed_in_step_sec: f64,
    sequence_epoch: u64,
    pending: Option<Pending>,
    session_start: Option<(Instant, DateTime<Utc>)>,
    last_tick: Option<Instant>,
    /// Remaining seconds at the previous tick, for second-boundary detection.
    previous_remaining: f64,
    last_displayed: Option<u64>,
    summary: Option<SessionSummary>,
}

impl PlaybackSession {
    /// Starts `Idle` on the first item.
    pub fn new(
        playlist: Playlist,
        beep_patterns: HashMap<String, String>,
        settings: Settings,
        io: PlayerIo,
    ) -> Self {
        Self {
            project_id: String::new(),
            playlist,
            beep_patterns,
            settings: settings.normalized(),
            io,
            status: PlayerStatus::Idle,
            current_index: 0,
            elapsed_in_step_sec: 0.0,
            sequence_epoch: 0,
            pending: None,
            session_start: None,
            last_tick: None,
            previous_remaining: 0.0,
            last_displayed: None,
            summary: None,
        }
    }

    /// Build the playlist of `project_id` from `library` and wrap it in a session.
    pub fn for_project(
        project_id: &str,
        library: &WorkoutLibrary,
        settings: Settings,
        io: PlayerIo,
    ) -> Result<Self, LibraryError> {
        let project = library.project(project_id)?;
        let playlist = Playlist::build(project, library);
        let mut session = Self::new(playlist, library.beep_patterns(), settings, io);
        session.project_id = project.id.clone();
        Ok(session)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn elapsed_in_step_sec(&self) -> f64 {
        self.elapsed_in_step_sec
    }

    pub fn sequence_epoch(&self) -> u64 {
        self.sequence_epoch
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Whether the step clock is counting down.
    pub fn is_clock_running(&self) -> bool {
        matches!(self.pending, Some(Pending::Tick))
    }

    /// Summary of the last completed session not yet handed to a log.
    pub fn pending_summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn take_summary(&mut self) -> Option<SessionSummary> {
        self.summary.take()
    }

    fn current_item(&self) -> Option<&PlaylistItem> {
        self.playlist.get(self.current_index)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let item = self.current_item();
        let duration_sec = item.map(PlaylistItem::duration_sec).unwrap_or(0.0);
        PlayerSnapshot {
            status: self.status,
            index: self.current_index,
            total: self.playlist.len(),
            label: item.map(|i| i.label().to_string()).unwrap_or_default(),
            kind: item.map(PlaylistItem::kind),
            set_title: item.map(|i| i.set().title.clone()).unwrap_or_default(),
            remaining_sec: (duration_sec - self.elapsed_in_step_sec).max(0.0),
            elapsed_sec: self.elapsed_in_step_sec,
            duration_sec,
            round: item.map(PlaylistItem::round).unwrap_or(0),
            total_rounds: item.map(PlaylistItem::total_rounds).unwrap_or(0),
            next_label: self.playlist.label_at(self.current_index + 1).to_string(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn play(&mut self) {
        let resuming = match self.status {
            PlayerStatus::Running => return,
            PlayerStatus::Completed => {
                self.current_index = 0;
                self.elapsed_in_step_sec = 0.0;
                self.bump_epoch();
                false
            }
            PlayerStatus::Paused => true,
            PlayerStatus::Idle => false,
        };
        if !resuming {
            self.session_start = Some((self.io.clock.now(), self.io.clock.utc_now()));
        }

        self.status = PlayerStatus::Running;
        info!(index = self.current_index, resuming, "playback running");
        if resuming {
            self.emit(PlayerEvent::Resumed {
                index: self.current_index,
                elapsed_sec: self.elapsed_in_step_sec,
            });
        } else {
            self.emit(PlayerEvent::Started {
                index: self.current_index,
            });
        }

        if self.playlist.is_empty() {
            self.complete();
            return;
        }

        self.io.tones.set_volume(self.settings.audio.volume);
        if self.elapsed_in_step_sec == 0.0 {
            self.begin_item();
        } else {
            self.start_clock();
        }
    }

    pub fn pause(&mut self) {
        if self.status != PlayerStatus::Running {
            return;
        }
        self.flush_elapsed();
        self.status = PlayerStatus::Paused;
        self.last_tick = None;
        if self.pending == Some(Pending::Tick) {
            self.pending = None;
        }
        info!(index = self.current_index, elapsed = self.elapsed_in_step_sec, "playback paused");
        self.emit(PlayerEvent::Paused {
            index: self.current_index,
            elapsed_sec: self.elapsed_in_step_sec,
        });
    }

    /// Back to `Idle` without moving; the next `play()` starts a new session.
    pub fn stop(&mut self) {
        if !matches!(self.status, PlayerStatus::Running | PlayerStatus::Paused) {
            return;
        }
        self.flush_elapsed();
        self.status = PlayerStatus::Idle;
        self.pending = None;
        self.last_tick = None;
        self.session_start = None;
        self.io.speech.cancel();
        info!(index = self.current_index, "playback stopped");
        self.emit(PlayerEvent::Stopped {
            index: self.current_index,
        });
    }

    pub fn next(&mut self) {
        if self.status == PlayerStatus::Completed {
            return;
        }
        if self.current_index + 1 >= self.playlist.len() {
            self.complete();
            return;
        }
        self.current_index += 1;
        self.enter_moved_item();
    }

    /// Restart the current item, or go back one when it has barely started.
    pub fn prev(&mut self) {
        if self.status == PlayerStatus::Completed {
            return;
        }
        self.flush_elapsed();
        if self.elapsed_in_step_sec >= PREV_RESTART_THRESHOLD_SEC {
            debug!(index = self.current_index, "restarting item");
        } else if self.current_index > 0 {
            self.current_index -= 1;
        } else {
            return;
        }
        self.enter_moved_item();
    }

    /// Jump to the item at `index`.
    pub fn seek(&mut self, index: usize) {
        if self.status == PlayerStatus::Completed {
            return;
        }
        if index >= self.playlist.len() {
            debug!(index, len = self.playlist.len(), "seek past end ignored");
            return;
        }
        self.current_index = index;
        self.enter_moved_item();
    }

    /// Swap in new settings; they apply from the next read.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings.normalized();
        self.io.tones.set_volume(self.settings.audio.volume);
    }

    /// Drive the session from the host's refresh loop.
    pub fn on_frame(&mut self) {
        match self.pending.take() {
            None => {}
            Some(Pending::Tick) => self.tick(),
            Some(Pending::Speech { epoch, then }) => {
                if self.io.speech.is_speaking() {
                    self.pending = Some(Pending::Speech { epoch, then });
                } else {
                    self.resume(epoch, then);
                }
            }
            Some(Pending::Until { epoch, at, then }) => {
                if self.io.clock.now() < at {
                    self.pending = Some(Pending::Until { epoch, at, then });
                } else {
                    self.resume(epoch, then);
                }
            }
        }
    }

    /// Turn the pending summary into a record and hand it to `sink`.
    ///
    /// The summary stays pending when the feedback is invalid or the sink fails.
    pub fn submit_feedback(
        &mut self,
        feedback: SessionFeedback,
        sink: &mut dyn SessionLogSink,
    ) -> Result<SessionRecord, CoreError> {
        feedback.validate()?;
        let summary = self
            .summary
            .take()
            .ok_or_else(|| CoreError::Custom("no completed session to record".into()))?;
        let record = SessionRecord::new(&self.project_id, &summary, feedback);
        if let Err(e) = sink.record(&record) {
            warn!(error = %e, "failed to record session");
            self.summary = Some(summary);
            return Err(e);
        }
        info!(id = %record.id, "session recorded");
        Ok(record)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn emit(&mut self, event: PlayerEvent) {
        trace!(?event, "player event");
        let snapshot = self.snapshot();
        self.io.ui.refresh(&snapshot, &event);
    }

    fn bump_epoch(&mut self) {
        self.sequence_epoch = self.sequence_epoch.wrapping_add(1);
    }

    /// Add wall time since the last tick to the step clock.
    fn flush_elapsed(&mut self) {
        if self.status != PlayerStatus::Running {
            return;
        }
        if let Some(last) = self.last_tick {
            let now = self.io.clock.now();
            self.elapsed_in_step_sec += now.saturating_duration_since(last).as_secs_f64();
            self.last_tick = Some(now);
        }
    }

    fn enter_moved_item(&mut self) {
        self.elapsed_in_step_sec = 0.0;
        self.bump_epoch();
        self.last_displayed = None;
        if self.status == PlayerStatus::Running {
            self.pending = None;
            self.begin_item();
        } else {
            self.emit(PlayerEvent::Moved {
                index: self.current_index,
            });
        }
    }

    fn complete(&mut self) {
        self.status = PlayerStatus::Completed;
        self.pending = None;
        self.last_tick = None;

        let now = self.io.clock.now();
        let completed_at = self.io.clock.utc_now();
        // Skipping past the end of a session that never ran records nothing.
        let duration_sec = match self.session_start.take() {
            Some((started, started_at)) => {
                let duration_sec = now.saturating_duration_since(started).as_secs_f64();
                self.summary = Some(SessionSummary {
                    started_at,
                    completed_at,
                    duration_sec,
                });
                duration_sec
            }
            None => 0.0,
        };

        info!(duration_sec, "workout completed");
        self.emit(PlayerEvent::Completed { duration_sec });
    }

    /// Text announced when entering the item at `index`.
    fn announcement(&self, index: usize) -> String {
        match self.playlist.get(index) {
            Some(PlaylistItem::Step { step, .. }) => step.name.trim().to_string(),
            Some(PlaylistItem::Rest { .. }) => {
                format!("Rest. Next up: {}", self.playlist.label_at(index + 1))
            }
            None => String::new(),
        }
    }

    /// Speak `text` if there is anything to say; true when speech accepted it.
    fn announce(&mut self, text: String) -> bool {
        if text.is_empty() {
            return false;
        }
        let spoken = self.io.speech.speak(&text);
        if !spoken {
            debug!(%text, "speech unavailable");
        }
        self.emit(PlayerEvent::Announced {
            index: self.current_index,
            text,
            spoken,
        });
        spoken
    }

    fn begin_item(&mut self) {
        let epoch = self.sequence_epoch;
        self.last_displayed = None;
        self.last_tick = None;

        let (kind, label) = match self.current_item() {
            Some(item) => (item.kind(), item.label().to_string()),
            None => {
                self.complete();
                return;
            }
        };
        debug!(index = self.current_index, %label, "entering item");
        self.emit(PlayerEvent::ItemEntered {
            index: self.current_index,
            kind,
            label,
        });

        let mut spoke = false;
        if self.settings.speech.enabled {
            let text = self.announcement(self.current_index);
            spoke = self.announce(text);
        }
        if spoke {
            self.pending = Some(Pending::Speech {
                epoch,
                then: Stage::AfterName { spoke },
            });
            return;
        }
        self.advance(epoch, Stage::AfterName { spoke });
    }

    /// Resume a continuation unless the session moved on since it was stored.
    fn resume(&mut self, epoch: u64, stage: Stage) {
        if self.status != PlayerStatus::Running || epoch != self.sequence_epoch {
            debug!(?stage, epoch, current = self.sequence_epoch, "stale continuation dropped");
            return;
        }
        self.advance(epoch, stage);
    }

    /// Store a timed wait. Returns false when there is nothing to wait for.
    fn wait(&mut self, epoch: u64, delay_sec: f64, then: Stage) -> bool {
        if delay_sec <= 0.0 {
            return false;
        }
        let now = self.io.clock.now();
        let delay = Duration::try_from_secs_f64(delay_sec).unwrap_or(MAX_WAIT);
        let at = now
            .checked_add(delay.min(MAX_WAIT))
            .unwrap_or(now);
        self.pending = Some(Pending::Until { epoch, at, then });
        true
    }

    /// Run entry stages until one has to wait.
    fn advance(&mut self, epoch: u64, mut stage: Stage) {
        loop {
            stage = match stage {
                Stage::AfterName { spoke } => {
                    let has_instructions = self
                        .current_item()
                        .and_then(PlaylistItem::step)
                        .and_then(|step| step.instructions())
                        .is_some();
                    let speech = &self.settings.speech;
                    if speech.enabled && speech.read_instructions && has_instructions {
                        let delay = if spoke {
                            self.settings.timing.name_to_instructions()
                        } else {
                            0.0
                        };
                        let next = Stage::Instructions { spoke };
                        if self.wait(epoch, delay, next) {
                            return;
                        }
                        next
                    } else {
                        Stage::AfterAnnouncement { spoke }
                    }
                }
                Stage::Instructions { spoke } => {
                    let text = self
                        .current_item()
                        .and_then(PlaylistItem::step)
                        .and_then(|step| step.instructions())
                        .map(str::to_string)
                        .unwrap_or_default();
                    if self.announce(text) {
                        self.pending = Some(Pending::Speech {
                            epoch,
                            then: Stage::AfterAnnouncement { spoke: true },
                        });
                        return;
                    }
                    Stage::AfterAnnouncement { spoke }
                }
                Stage::AfterAnnouncement { spoke } => {
                    let delay = if spoke {
                        self.settings.timing.tts_to_cue()
                    } else {
                        0.0
                    };
                    if self.wait(epoch, delay, Stage::StartCues) {
                        return;
                    }
                    Stage::StartCues
                }
                Stage::StartCues => {
                    let longest = self.fire_start_cues();
                    let next = Stage::AfterCues {
                        fired: longest > 0.0,
                    };
                    if self.wait(epoch, longest, next) {
                        return;
                    }
                    next
                }
                Stage::AfterCues { fired } => {
                    let delay = if fired {
                        self.settings.timing.cue_to_clock()
                    } else {
                        0.0
                    };
                    if self.wait(epoch, delay, Stage::StartClock) {
                        return;
                    }
                    Stage::StartClock
                }
                Stage::StartClock => {
                    self.start_clock();
                    return;
                }
            };
        }
    }

    /// Schedule a beep code `delay_sec` from now on the audio clock.
    ///
    /// Returns the scheduled length, `0.0` for unknown codes or silent output.
    fn fire_cue(&mut self, moment: CueMoment, beep_id: &str, delay_sec: f64) -> f64 {
        let Some(pattern) = self.beep_patterns.get(beep_id) else {
            debug!(beep_id, ?moment, "unknown beep code, cue skipped");
            return 0.0;
        };
        let duration_sec = self.io.tones.schedule_in(pattern, delay_sec);
        self.emit(PlayerEvent::CueFired {
            index: self.current_index,
            moment,
            beep_id: beep_id.to_string(),
            duration_sec,
        });
        duration_sec
    }

    /// Step and set start cues together; returns the longest scheduled one.
    fn fire_start_cues(&mut self) -> f64 {
        let Some(PlaylistItem::Step {
            step,
            set,
            is_first_step_in_set,
            ..
        }) = self.current_item().cloned()
        else {
            return 0.0;
        };

        let mut longest: f64 = 0.0;
        if let Some(id) = step.beep.on_start() {
            longest = longest.max(self.fire_cue(CueMoment::StepStart, id, 0.0));
        }
        if is_first_step_in_set {
            if let Some(id) = set.beep.on_start() {
                longest = longest.max(self.fire_cue(CueMoment::SetStart, id, 0.0));
            }
        }
        longest
    }

    fn fire_end_cues(&mut self) {
        let Some(PlaylistItem::Step {
            step,
            set,
            is_last_step_in_set,
            ..
        }) = self.current_item().cloned()
        else {
            return;
        };

        if let Some(id) = step.beep.on_end() {
            self.fire_cue(CueMoment::StepEnd, id, 0.0);
        }
        if is_last_step_in_set {
            if let Some(id) = set.beep.on_end() {
                self.fire_cue(CueMoment::SetEnd, id, SET_END_CUE_OFFSET_SEC);
            }
        }
    }

    fn start_clock(&mut self) {
        let duration = self
            .current_item()
            .map(PlaylistItem::duration_sec)
            .unwrap_or(0.0);
        self.last_tick = Some(self.io.clock.now());
        // Mid-item, keep the last evaluated value so a boundary crossed by
        // time flushed on pause is still evaluated on the next tick.
        if self.elapsed_in_step_sec == 0.0 {
            self.previous_remaining = duration;
        }
        self.pending = Some(Pending::Tick);
        self.emit(PlayerEvent::ClockStarted {
            index: self.current_index,
            elapsed_sec: self.elapsed_in_step_sec,
        });
    }

    fn tick(&mut self) {
        if self.status != PlayerStatus::Running {
            return;
        }
        let now = self.io.clock.now();
        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.elapsed_in_step_sec += delta;

        let Some(item) = self.current_item().cloned() else {
            self.complete();
            return;
        };
        let duration = item.duration_sec();
        let remaining = (duration - self.elapsed_in_step_sec).max(0.0);
        let whole = cues::whole_seconds(remaining);

        let shown = whole as u64;
        if self.last_displayed != Some(shown) {
            self.last_displayed = Some(shown);
            self.emit(PlayerEvent::DisplayTick {
                index: self.current_index,
                remaining_sec: shown,
            });
        }

        if cues::crossed_boundary(self.previous_remaining, remaining) {
            if let Some(step) = item.step() {
                for (moment, id) in cues::boundary_cues(&step.beep, duration, whole) {
                    self.fire_cue(moment, id, 0.0);
                }
            }
        }
        self.previous_remaining = remaining;

        if remaining <= 0.0 {
            self.fire_end_cues();
            self.next();
            return;
        }
        self.pending = Some(Pending::Tick);
    }
}
