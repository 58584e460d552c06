// src/tracking/clock.rs
//! Elapsed-time clock for a tracking session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How paused time is treated once tracking resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseAccounting {
    /// Sum of the intervals spent tracking; pauses never count.
    #[default]
    ActiveOnly,
    /// `now - start_time`; a pause is frozen on screen but counted again
    /// after resume.
    WallClock,
}

/// Wall-clock timer that only advances while it is running.
///
/// Time is always passed in, so the clock is deterministic under test.
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    accounting: PauseAccounting,
    start_time: Option<DateTime<Utc>>,
    running_since: Option<DateTime<Utc>>,
    banked_secs: f64,
    elapsed_secs: f64,
}

impl ElapsedClock {
    pub fn new(accounting: PauseAccounting) -> Self {
        Self {
            accounting,
            start_time: None,
            running_since: None,
            banked_secs: 0.0,
            elapsed_secs: 0.0,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.start_time = Some(now);
        self.running_since = Some(now);
        self.banked_secs = 0.0;
        self.elapsed_secs = 0.0;
    }

    /// Recompute the elapsed time. Does nothing while stopped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> f64 {
        let Some(since) = self.running_since else {
            return self.elapsed_secs;
        };

        let computed = match self.accounting {
            PauseAccounting::ActiveOnly => self.banked_secs + seconds_between(since, now),
            PauseAccounting::WallClock => self
                .start_time
                .map_or(0.0, |start| seconds_between(start, now)),
        };

        // Never run backwards if the system clock steps
        self.elapsed_secs = self.elapsed_secs.max(computed);
        self.elapsed_secs
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.running_since.is_some() {
            self.tick(now);
            self.banked_secs = self.elapsed_secs;
            self.running_since = None;
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.running_since.is_none() && self.start_time.is_some() {
            self.running_since = Some(now);
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        self.pause(now);
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.accounting);
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn accounting(&self) -> PauseAccounting {
        self.accounting
    }
}

impl Default for ElapsedClock {
    fn default() -> Self {
        Self::new(PauseAccounting::default())
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = to.signed_duration_since(from).num_milliseconds();
    (millis.max(0) as f64) / 1000.0
}
