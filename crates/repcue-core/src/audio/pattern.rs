//! Beep pattern mini-language.
//!
//! A pattern is a list of tokens separated by single spaces:
//!
//! ```text
//! S        short tone (120 ms, 880 Hz)
//! L        long tone (500 ms, 880 Hz)
//! P(250)   pause for 250 ms
//! ```
//!
//! Tokens that are not recognized are dropped without moving the cursor, so
//! a malformed pattern degrades to a partial (or empty) event list instead of
//! failing. Offsets are accumulated in whole milliseconds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Frequency of every beep tone.
pub const BEEP_FREQUENCY_HZ: f64 = 880.0;
/// Length of an `S` tone in milliseconds.
pub const SHORT_TONE_MS: u64 = 120;
/// Length of an `L` tone in milliseconds.
pub const LONG_TONE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneKind {
    Tone,
    SilenceBoundary,
}

/// One timed event of a compiled pattern, relative to the pattern start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneEvent {
    pub kind: ToneKind,
    pub start_offset_sec: f64,
    pub duration_sec: f64,
    pub frequency_hz: f64,
}

impl ToneEvent {
    fn tone(start_ms: u64, duration_ms: u64) -> Self {
        Self {
            kind: ToneKind::Tone,
            start_offset_sec: start_ms as f64 / 1000.0,
            duration_sec: duration_ms as f64 / 1000.0,
            frequency_hz: BEEP_FREQUENCY_HZ,
        }
    }

    pub fn end_offset_sec(&self) -> f64 {
        self.start_offset_sec + self.duration_sec
    }
}

/// Result of compiling one pattern string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledPattern {
    pub events: Vec<ToneEvent>,
    /// End of the last tone; trailing pauses do not count.
    pub duration_sec: f64,
}

impl CompiledPattern {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Short,
    Long,
    Pause(u64),
}

fn parse_token(token: &str) -> Option<Token> {
    match token {
        "S" => Some(Token::Short),
        "L" => Some(Token::Long),
        _ => {
            let rest = token.strip_prefix("P(")?;
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..end].parse::<u64>().ok().map(Token::Pause)
        }
    }
}

/// Compile a pattern without touching any cache.
pub fn compile(pattern: &str) -> CompiledPattern {
    let mut events = Vec::new();
    let mut cursor_ms: u64 = 0;
    let mut end_ms: u64 = 0;

    for token in pattern.split(' ').filter(|t| !t.is_empty()) {
        match parse_token(token) {
            Some(Token::Short) => {
                events.push(ToneEvent::tone(cursor_ms, SHORT_TONE_MS));
                cursor_ms = cursor_ms.saturating_add(SHORT_TONE_MS);
                end_ms = cursor_ms;
            }
            Some(Token::Long) => {
                events.push(ToneEvent::tone(cursor_ms, LONG_TONE_MS));
                cursor_ms = cursor_ms.saturating_add(LONG_TONE_MS);
                end_ms = cursor_ms;
            }
            Some(Token::Pause(ms)) => {
                cursor_ms = cursor_ms.saturating_add(ms);
            }
            None => {
                tracing::debug!(token, pattern, "skipping unrecognized beep token");
            }
        }
    }

    CompiledPattern {
        events,
        duration_sec: end_ms as f64 / 1000.0,
    }
}

/// Memoizing compiler, keyed by the exact pattern text.
#[derive(Debug, Default)]
pub struct PatternCompiler {
    cache: Mutex<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, pattern: &str) -> Arc<CompiledPattern> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(pattern) {
            return Arc::clone(hit);
        }
        let compiled = Arc::new(compile(pattern));
        cache.insert(pattern.to_string(), Arc::clone(&compiled));
        compiled
    }

    /// Seconds from pattern start to the end of its last tone.
    pub fn duration(&self, pattern: &str) -> f64 {
        self.compile(pattern).duration_sec
    }

    /// Number of distinct patterns compiled so far.
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
