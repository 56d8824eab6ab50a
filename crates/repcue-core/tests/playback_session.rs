//! Integration tests for the playback session.
//!
//! Drives full sessions with a manual clock and recording speech, audio and
//! display collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use repcue_core::audio::{AudioBackend, AudioTime, ScheduledTone, ToneScheduler};
use repcue_core::player::{CueMoment, PlayerEvent, PlayerSnapshot, PlayerStatus};
use repcue_core::storage::{MemoryLog, SessionFeedback};
use repcue_core::{ManualClock, PlaybackSession, PlayerIo, Settings, SpeechAnnouncer, WorkoutLibrary};
use serde_json::json;

#[derive(Clone, Default)]
struct Speech {
    spoken: Rc<RefCell<Vec<String>>>,
    speaking: Rc<Cell<bool>>,
}

impl SpeechAnnouncer for Speech {
    fn speak(&mut self, text: &str) -> bool {
        self.spoken.borrow_mut().push(text.to_string());
        self.speaking.set(true);
        true
    }

    fn is_speaking(&mut self) -> bool {
        self.speaking.get()
    }

    fn cancel(&mut self) {
        self.speaking.set(false);
    }
}

#[derive(Clone, Default)]
struct Audio {
    now: Rc<Cell<AudioTime>>,
    tones: Rc<RefCell<Vec<ScheduledTone>>>,
}

impl AudioBackend for Audio {
    fn now(&self) -> Option<AudioTime> {
        Some(self.now.get())
    }

    fn enqueue(&mut self, tone: ScheduledTone) {
        self.tones.borrow_mut().push(tone);
    }

    fn set_volume(&mut self, _volume: f64) {}
}

type Seen = Rc<RefCell<Vec<(PlayerSnapshot, PlayerEvent)>>>;

struct Harness {
    session: PlaybackSession,
    clock: ManualClock,
    speech: Speech,
    audio: Audio,
    seen: Seen,
}

impl Harness {
    fn new(library: serde_json::Value, settings: Settings) -> Self {
        let library: WorkoutLibrary = serde_json::from_value(library).unwrap();
        let clock = ManualClock::new();
        let speech = Speech::default();
        let audio = Audio::default();
        let seen: Seen = Rc::default();
        let sink = seen.clone();
        let io = PlayerIo::new(
            Box::new(clock.clone()),
            Box::new(speech.clone()),
            ToneScheduler::new(Box::new(audio.clone())),
            Box::new(move |s: &PlayerSnapshot, e: &PlayerEvent| {
                sink.borrow_mut().push((s.clone(), e.clone()))
            }),
        );
        let session = PlaybackSession::for_project("p1", &library, settings, io).unwrap();
        Self {
            session,
            clock,
            speech,
            audio,
            seen,
        }
    }

    fn quiet(library: serde_json::Value) -> Self {
        let mut settings = Settings::default();
        settings.speech.enabled = false;
        Self::new(library, settings)
    }

    fn frame(&mut self, secs: f64) {
        self.clock.advance_secs(secs);
        self.session.on_frame();
    }

    /// Run frames until the session leaves `Running` or `limit` frames pass.
    fn run(&mut self, secs: f64, limit: usize) {
        for _ in 0..limit {
            if self.session.status() != PlayerStatus::Running {
                return;
            }
            self.frame(secs);
        }
    }

    fn cues(&self, moment: CueMoment) -> Vec<PlayerSnapshot> {
        self.seen
            .borrow()
            .iter()
            .filter(|(_, e)| matches!(e, PlayerEvent::CueFired { moment: m, .. } if *m == moment))
            .map(|(s, _)| s.clone())
            .collect()
    }

    fn count(&self, pred: impl Fn(&PlayerEvent) -> bool) -> usize {
        self.seen.borrow().iter().filter(|(_, e)| pred(e)).count()
    }
}

fn single_step(duration_sec: f64, beep: serde_json::Value) -> serde_json::Value {
    json!({
        "beepCodes": {
            "short": { "id": "short", "label": "Short", "pattern": "S" },
            "long": { "id": "long", "label": "Long", "pattern": "L" },
            "double": { "id": "double", "label": "Double", "pattern": "S P(120) S" }
        },
        "projects": { "p1": { "id": "p1", "name": "Core", "exerciseSetIds": ["s1"] } },
        "exerciseSets": {
            "s1": { "id": "s1", "title": "Main", "rounds": 1, "stepIds": ["a"] }
        },
        "exerciseSteps": {
            "a": { "id": "a", "name": "Plank", "durationSec": duration_sec, "beep": beep }
        }
    })
}

fn two_steps() -> serde_json::Value {
    json!({
        "projects": { "p1": { "id": "p1", "name": "Core", "exerciseSetIds": ["s1"] } },
        "exerciseSets": {
            "s1": { "id": "s1", "title": "Main", "rounds": 1, "stepIds": ["a", "b"] }
        },
        "exerciseSteps": {
            "a": { "id": "a", "name": "Plank", "durationSec": 20 },
            "b": { "id": "b", "name": "Squat", "durationSec": 20 }
        }
    })
}

#[test]
fn countdown_fires_on_last_five_seconds() {
    let mut h = Harness::quiet(single_step(
        30.0,
        json!({ "countdown": "short", "countdownFromSec": 5 }),
    ));
    h.session.play();
    h.run(0.25, 200);

    let fired: Vec<f64> = h
        .cues(CueMoment::Countdown)
        .iter()
        .map(|s| s.remaining_sec.ceil())
        .collect();
    assert_eq!(fired, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    assert_eq!(h.session.status(), PlayerStatus::Completed);
}

#[test]
fn countdown_survives_a_pause_just_after_a_boundary() {
    let mut h = Harness::quiet(single_step(
        30.0,
        json!({ "countdown": "short", "countdownFromSec": 5 }),
    ));
    h.session.play();
    for _ in 0..99 {
        h.frame(0.25);
    }
    h.frame(0.23);
    h.clock.advance_secs(0.04);
    h.session.pause();
    h.session.play();
    h.run(0.25, 100);

    let fired: Vec<f64> = h
        .cues(CueMoment::Countdown)
        .iter()
        .map(|s| s.remaining_sec.ceil())
        .collect();
    assert_eq!(fired, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
}

#[test]
fn interval_fires_every_ten_seconds() {
    let mut h = Harness::quiet(single_step(
        40.0,
        json!({ "interval": "short", "intervalSec": 10 }),
    ));
    h.session.play();
    h.run(0.25, 400);

    let fired: Vec<f64> = h
        .cues(CueMoment::Interval)
        .iter()
        .map(|s| s.elapsed_sec)
        .collect();
    assert_eq!(fired, vec![10.0, 20.0, 30.0]);
}

#[test]
fn pause_before_announcement_ends_prevents_cues_and_clock() {
    let mut h = Harness::new(
        single_step(10.0, json!({ "onStart": "short" })),
        Settings::default(),
    );
    h.session.play();
    assert_eq!(h.speech.spoken.borrow().as_slice(), ["Plank"]);

    h.session.pause();
    h.speech.speaking.set(false);
    h.frame(1.0);
    h.frame(1.0);

    assert!(h.cues(CueMoment::StepStart).is_empty());
    assert!(!h.session.is_clock_running());
    assert_eq!(h.count(|e| matches!(e, PlayerEvent::ClockStarted { .. })), 0);
    assert!(h.audio.tones.borrow().is_empty());
}

#[test]
fn resume_after_pause_in_delay_restarts_the_entry_sequence() {
    let mut h = Harness::new(single_step(10.0, json!({})), Settings::default());
    h.session.play();
    h.speech.speaking.set(false);
    h.frame(0.1);
    h.session.pause();
    h.frame(1.0);
    assert!(!h.session.is_clock_running());

    h.session.play();
    assert_eq!(h.speech.spoken.borrow().len(), 2);
}

#[test]
fn entry_sequence_waits_for_speech_cues_and_delays() {
    let mut settings = Settings::default();
    settings.speech.read_instructions = true;
    let mut library = single_step(10.0, json!({ "onStart": "long" }));
    library["exerciseSteps"]["a"]["instructions"] = json!("Keep your back straight");
    let mut h = Harness::new(library, settings);

    h.session.play();
    assert_eq!(h.speech.spoken.borrow().as_slice(), ["Plank"]);
    h.frame(0.25);
    assert_eq!(h.speech.spoken.borrow().len(), 1);

    // name -> instructions delay
    h.speech.speaking.set(false);
    h.frame(0.0);
    h.frame(0.5);
    assert_eq!(
        h.speech.spoken.borrow().as_slice(),
        ["Plank", "Keep your back straight"]
    );

    // tts -> cue delay
    h.speech.speaking.set(false);
    h.frame(0.0);
    assert!(h.cues(CueMoment::StepStart).is_empty());
    h.frame(0.5);
    assert_eq!(h.cues(CueMoment::StepStart).len(), 1);

    // cue length, then cue -> clock delay
    h.frame(0.5);
    assert!(!h.session.is_clock_running());
    h.frame(0.5);
    assert!(h.session.is_clock_running());
    assert_eq!(h.session.elapsed_in_step_sec(), 0.0);
}

#[test]
fn next_on_final_item_completes_once() {
    let mut h = Harness::quiet(two_steps());
    h.session.play();
    h.session.next();
    assert_eq!(h.session.current_index(), 1);
    h.session.next();
    assert_eq!(h.session.status(), PlayerStatus::Completed);
    h.session.next();
    h.session.next();

    assert_eq!(h.session.status(), PlayerStatus::Completed);
    assert_eq!(h.session.current_index(), 1);
    assert_eq!(h.count(|e| matches!(e, PlayerEvent::Completed { .. })), 1);
}

#[test]
fn prev_moves_back_early_and_restarts_late() {
    let mut h = Harness::quiet(two_steps());
    h.session.play();
    h.session.seek(1);
    h.frame(1.0);
    h.session.prev();
    assert_eq!(h.session.current_index(), 0);

    h.session.seek(1);
    for _ in 0..14 {
        h.frame(0.25);
    }
    let epoch = h.session.sequence_epoch();
    h.session.prev();
    assert_eq!(h.session.current_index(), 1);
    assert_eq!(h.session.elapsed_in_step_sec(), 0.0);
    assert_eq!(h.session.sequence_epoch(), epoch + 1);
    assert!(h.session.is_clock_running());
}

#[test]
fn elapsed_never_decreases_within_an_item() {
    let mut h = Harness::quiet(json!({
        "projects": { "p1": { "id": "p1", "exerciseSetIds": ["s1"] } },
        "exerciseSets": {
            "s1": { "id": "s1", "rounds": 2, "restBetweenRoundsSec": 3, "stepIds": ["a"] }
        },
        "exerciseSteps": { "a": { "id": "a", "name": "Lunge", "durationSec": 4.5 } }
    }));
    h.session.play();
    let frames = [0.016, 0.3, 1.7, 0.05, 0.9];
    for i in 0..200 {
        if h.session.status() != PlayerStatus::Running {
            break;
        }
        h.frame(frames[i % frames.len()]);
    }
    assert_eq!(h.session.status(), PlayerStatus::Completed);

    let seen = h.seen.borrow();
    let mut last: Option<(usize, f64)> = None;
    for (snapshot, _) in seen.iter() {
        assert!(snapshot.remaining_sec >= 0.0);
        if let Some((index, elapsed)) = last {
            if index == snapshot.index && snapshot.status == PlayerStatus::Running {
                assert!(snapshot.elapsed_sec >= elapsed);
            }
        }
        last = Some((snapshot.index, snapshot.elapsed_sec));
    }
}

#[test]
fn empty_playlist_completes_immediately() {
    let mut h = Harness::quiet(json!({
        "projects": { "p1": { "id": "p1", "exerciseSetIds": ["missing"] } }
    }));
    h.session.play();
    assert_eq!(h.session.status(), PlayerStatus::Completed);
    assert!(h.session.pending_summary().is_some());
}

#[test]
fn missing_cue_ids_are_skipped() {
    let mut h = Harness::quiet(single_step(
        3.0,
        json!({ "onStart": "ghost", "onEnd": "ghost", "countdown": "ghost", "countdownFromSec": 3 }),
    ));
    h.session.play();
    assert!(h.session.is_clock_running());
    h.run(0.5, 20);
    assert_eq!(h.session.status(), PlayerStatus::Completed);
    assert_eq!(h.count(|e| matches!(e, PlayerEvent::CueFired { .. })), 0);
}

#[test]
fn rest_announces_the_next_item() {
    let mut h = Harness::new(
        json!({
            "projects": { "p1": { "id": "p1", "exerciseSetIds": ["s1"] } },
            "exerciseSets": {
                "s1": { "id": "s1", "rounds": 2, "restBetweenRoundsSec": 20, "stepIds": ["a"] }
            },
            "exerciseSteps": { "a": { "id": "a", "name": "Burpee", "durationSec": 30 } }
        }),
        Settings::default(),
    );
    h.session.play();
    h.session.seek(1);
    assert_eq!(
        h.speech.spoken.borrow().as_slice(),
        ["Burpee", "Rest. Next up: Burpee"]
    );
}

#[test]
fn set_end_cue_follows_step_end_cue() {
    let mut h = Harness::quiet(json!({
        "beepCodes": {
            "end": { "id": "end", "pattern": "S" },
            "setEnd": { "id": "setEnd", "pattern": "L" }
        },
        "projects": { "p1": { "id": "p1", "exerciseSetIds": ["s1"] } },
        "exerciseSets": {
            "s1": { "id": "s1", "stepIds": ["a"], "beep": { "onEnd": "setEnd" } }
        },
        "exerciseSteps": {
            "a": { "id": "a", "name": "Hold", "durationSec": 2, "beep": { "onEnd": "end" } }
        }
    }));
    h.audio.now.set(10.0);
    h.session.play();
    h.run(0.5, 10);

    let tones = h.audio.tones.borrow();
    assert_eq!(tones.len(), 2);
    assert!((tones[0].start - 10.0).abs() < 1e-9);
    assert!((tones[0].duration_sec - 0.12).abs() < 1e-9);
    assert!((tones[1].start - 10.5).abs() < 1e-9);
    assert!((tones[1].duration_sec - 0.5).abs() < 1e-9);
    assert_eq!(h.cues(CueMoment::SetEnd).len(), 1);
}

#[test]
fn feedback_is_recorded_once() {
    let mut h = Harness::quiet(single_step(1.0, json!({})));
    h.session.play();
    h.frame(1.0);
    assert_eq!(h.session.status(), PlayerStatus::Completed);

    let mut log = MemoryLog::default();
    let bad = SessionFeedback {
        rpe: Some(12),
        ..SessionFeedback::default()
    };
    assert!(h.session.submit_feedback(bad, &mut log).is_err());
    assert!(h.session.pending_summary().is_some());

    let good = SessionFeedback {
        rpe: Some(6),
        pain_score: Some(0),
        pain_location: None,
    };
    let record = h.session.submit_feedback(good, &mut log).unwrap();
    assert_eq!(record.project_id, "p1");
    assert!((record.duration_sec - 1.0).abs() < 1e-9);
    assert_eq!(log.records.len(), 1);
    assert!(h.session.pending_summary().is_none());
    assert!(h.session.submit_feedback(SessionFeedback::default(), &mut log).is_err());
}
