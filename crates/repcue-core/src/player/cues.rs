//! Per-second cue rules of a running step.
//!
//! Rules are evaluated with the whole number of seconds left on the display,
//! `ceil(remaining)`, and only when that number changes.

use super::events::CueMoment;
use crate::workout::StepBeeps;

/// How close elapsed time must be to a multiple of the interval.
pub const INTERVAL_TOLERANCE_SEC: f64 = 0.1;

/// Seconds shown on the display for `remaining`.
pub fn whole_seconds(remaining: f64) -> f64 {
    remaining.max(0.0).ceil()
}

/// Whether going from `previous` to `remaining` crossed a displayed second.
pub fn crossed_boundary(previous: f64, remaining: f64) -> bool {
    whole_seconds(previous) != whole_seconds(remaining)
}

pub fn countdown_fires(whole: f64, from_sec: f64) -> bool {
    whole > 0.0 && whole <= from_sec
}

/// Elapsed time at the full duration (nothing left) never fires.
pub fn interval_fires(duration_sec: f64, whole: f64, every_sec: f64) -> bool {
    if whole <= 0.0 || every_sec <= 0.0 {
        return false;
    }
    let elapsed = duration_sec - whole;
    if elapsed <= 0.0 {
        return false;
    }
    let phase = elapsed % every_sec;
    phase < INTERVAL_TOLERANCE_SEC || (every_sec - phase) < INTERVAL_TOLERANCE_SEC
}

/// Cues due when the display reaches `whole` seconds, countdown first.
pub fn boundary_cues(beeps: &StepBeeps, duration_sec: f64, whole: f64) -> Vec<(CueMoment, &str)> {
    let mut due = Vec::new();
    if let Some((id, from)) = beeps.countdown() {
        if countdown_fires(whole, from) {
            due.push((CueMoment::Countdown, id));
        }
    }
    if let Some((id, every)) = beeps.interval() {
        if interval_fires(duration_sec, whole, every) {
            due.push((CueMoment::Interval, id));
        }
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beeps() -> StepBeeps {
        StepBeeps {
            interval: Some("tick".into()),
            interval_sec: Some(10.0),
            countdown: Some("cd".into()),
            countdown_from_sec: Some(5.0),
            ..StepBeeps::default()
        }
    }

    #[test]
    fn boundaries_follow_display_seconds() {
        assert!(!crossed_boundary(30.0, 29.99));
        assert!(crossed_boundary(5.01, 4.99));
        assert!(crossed_boundary(0.01, 0.0));
        assert!(!crossed_boundary(0.0, -1.0));
    }

    #[test]
    fn countdown_window() {
        let fired: Vec<u32> = (0..=30)
            .filter(|s| countdown_fires(f64::from(*s), 5.0))
            .collect();
        assert_eq!(fired, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn interval_on_forty_seconds() {
        let fired: Vec<u32> = (0..=40)
            .rev()
            .filter(|s| interval_fires(40.0, f64::from(*s), 10.0))
            .map(|s| 40 - s)
            .collect();
        assert_eq!(fired, vec![10, 20, 30]);
    }

    #[test]
    fn interval_tolerates_fractional_durations() {
        // 40.05 s step: at 30 s left, 10.05 s have elapsed.
        assert!(interval_fires(40.05, 30.0, 10.0));
        assert!(!interval_fires(40.5, 30.0, 10.0));
    }

    #[test]
    fn both_rules_can_fire_together() {
        let b = beeps();
        let due = boundary_cues(&b, 15.0, 5.0);
        assert_eq!(
            due,
            vec![(CueMoment::Countdown, "cd"), (CueMoment::Interval, "tick")]
        );
        assert!(boundary_cues(&beeps(), 15.0, 0.0).is_empty());
        assert!(boundary_cues(&StepBeeps::default(), 15.0, 5.0).is_empty());
    }
}
