//! Wall-clock time sources.
//!
//! The player measures step time with monotonic [`Instant`]s and stamps
//! session records with UTC timestamps. Both come from one [`WallClock`] so
//! tests can drive them together.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

pub trait WallClock {
    fn now(&self) -> Instant;

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Rc<Cell<(Instant, DateTime<Utc>)>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Cell::new((Instant::now(), Utc::now()))),
        }
    }

    pub fn advance(&self, by: Duration) {
        let (instant, utc) = self.inner.get();
        let utc_by = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        self.inner.set((instant + by, utc + utc_by));
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::try_from_secs_f64(secs).unwrap_or_default());
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.get().0
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.get().1
    }
}
