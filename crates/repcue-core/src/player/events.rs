use serde::{Deserialize, Serialize};

use crate::workout::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Where in an item a cue was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueMoment {
    StepStart,
    SetStart,
    StepEnd,
    SetEnd,
    Interval,
    Countdown,
}

/// Every state change of a playback session produces an event.
/// The host receives it together with a fresh [`PlayerSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    Started {
        index: usize,
    },
    Resumed {
        index: usize,
        elapsed_sec: f64,
    },
    Paused {
        index: usize,
        elapsed_sec: f64,
    },
    Stopped {
        index: usize,
    },
    ItemEntered {
        index: usize,
        kind: ItemKind,
        label: String,
    },
    /// `spoken` is false when speech output refused the text.
    Announced {
        index: usize,
        text: String,
        spoken: bool,
    },
    /// A beep code resolved; `duration_sec` is what actually got scheduled.
    CueFired {
        index: usize,
        moment: CueMoment,
        beep_id: String,
        duration_sec: f64,
    },
    ClockStarted {
        index: usize,
        elapsed_sec: f64,
    },
    DisplayTick {
        index: usize,
        remaining_sec: u64,
    },
    /// Position changed while not running.
    Moved {
        index: usize,
    },
    Completed {
        duration_sec: f64,
    },
}

/// Serializable view of the player for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub kind: Option<ItemKind>,
    pub set_title: String,
    pub remaining_sec: f64,
    pub elapsed_sec: f64,
    pub duration_sec: f64,
    pub round: u32,
    pub total_rounds: u32,
    pub next_label: String,
}

impl PlayerSnapshot {
    /// Remaining time as shown on a countdown display.
    pub fn remaining_display(&self) -> String {
        let whole = self.remaining_sec.max(0.0).ceil() as u64;
        format!("{:02}:{:02}", whole / 60, whole % 60)
    }
}

/// Receives every player event; the host redraws from the snapshot.
pub trait UiRefresh {
    fn refresh(&mut self, snapshot: &PlayerSnapshot, event: &PlayerEvent);
}

impl<F> UiRefresh for F
where
    F: FnMut(&PlayerSnapshot, &PlayerEvent),
{
    fn refresh(&mut self, snapshot: &PlayerSnapshot, event: &PlayerEvent) {
        self(snapshot, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = PlayerEvent::CueFired {
            index: 2,
            moment: CueMoment::SetEnd,
            beep_id: "b1".into(),
            duration_sec: 0.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CueFired");
        assert_eq!(json["moment"], "set_end");

        let back: PlayerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn remaining_display_rounds_up() {
        let snapshot = PlayerSnapshot {
            status: PlayerStatus::Running,
            index: 0,
            total: 1,
            label: "Plank".into(),
            kind: Some(ItemKind::Step),
            set_title: String::new(),
            remaining_sec: 61.2,
            elapsed_sec: 0.0,
            duration_sec: 90.0,
            round: 1,
            total_rounds: 1,
            next_label: String::new(),
        };
        assert_eq!(snapshot.remaining_display(), "01:02");
    }
}
