// src/tracking/session.rs
//! Tracking session aggregate and its state machine
//!
//! Every change to a session goes through [`TrackingSession::handle`]:
//! control commands, location samples and clock ticks all arrive as a
//! [`SessionEvent`]. The session never touches a clock or a device itself,
//! so any sequence of events can be replayed deterministically.

use super::{
    clock::{ElapsedClock, PauseAccounting},
    distance::{segment_distance, DistanceAccumulator},
    elevation::{ElevationSmoother, ELEVATION_HISTORY_CAPACITY},
    path::PathSimplifier,
    result::{FinalizedHike, SessionMeta, TrackingResult},
    validator::{RejectReason, SampleValidator, ValidatorLimits, Verdict},
};
use crate::{
    error::{Result, TrackerError},
    gps::data::{RawSample, TrackPoint},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Tracking,
    Paused,
    Stopped,
}

impl SessionState {
    /// Tracking or paused: a subscription and a session are live.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Tracking | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Tracking => "tracking",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Control commands issued by the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
}

impl Command {
    pub fn allowed_from(&self, state: SessionState) -> bool {
        match self {
            Command::Start => state == SessionState::Idle,
            Command::Pause => state == SessionState::Tracking,
            Command::Resume => state == SessionState::Paused,
            Command::Stop => state.is_active(),
            Command::Reset => true,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Tunables for the per-sample pipeline
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub validator: ValidatorLimits,
    pub elevation_window: usize,
    pub min_elevation_gain_m: f64,
    pub min_path_spacing_m: f64,
    pub pause_accounting: PauseAccounting,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            validator: ValidatorLimits::default(),
            elevation_window: ELEVATION_HISTORY_CAPACITY,
            min_elevation_gain_m: 1.0,
            min_path_spacing_m: 2.0,
            pause_accounting: PauseAccounting::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Start {
        fix: RawSample,
        meta: SessionMeta,
        at: DateTime<Utc>,
    },
    Sample(RawSample),
    Tick(DateTime<Utc>),
    Pause(DateTime<Utc>),
    Resume(DateTime<Utc>),
    Stop(DateTime<Utc>),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Started,
    Accepted { segment_m: f64, appended: bool },
    Rejected(RejectReason),
    /// Sample or tick arrived while the session was not tracking
    Ignored,
    Ticked { elapsed_secs: f64 },
    Paused,
    Resumed,
    /// Carries the finalized hike when the path holds more than the seed point
    Stopped(Option<FinalizedHike>),
    Reset,
}

/// Read model published to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    pub total_distance_m: f64,
    pub total_elevation_gain_m: f64,
    pub current_position: Option<RawSample>,
    pub path_len: usize,
    pub accepted_samples: u64,
    pub rejected_samples: u64,
}

pub struct TrackingSession {
    state: SessionState,
    validator: SampleValidator,
    smoother: ElevationSmoother,
    accumulator: DistanceAccumulator,
    simplifier: PathSimplifier,
    clock: ElapsedClock,
    path: Vec<TrackPoint>,
    meta: Option<SessionMeta>,
    last_sample: Option<RawSample>,      // validation context
    last_accepted: Option<RawSample>,    // segment reference
    current_position: Option<RawSample>,
    accepted_samples: u64,
    rejected_samples: u64,
    result: Option<FinalizedHike>,
}

impl TrackingSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            state: SessionState::Idle,
            validator: SampleValidator::new(settings.validator),
            smoother: ElevationSmoother::new(settings.elevation_window),
            accumulator: DistanceAccumulator::new(settings.min_elevation_gain_m),
            simplifier: PathSimplifier::new(settings.min_path_spacing_m),
            clock: ElapsedClock::new(settings.pause_accounting),
            path: Vec::new(),
            meta: None,
            last_sample: None,
            last_accepted: None,
            current_position: None,
            accepted_samples: 0,
            rejected_samples: 0,
            result: None,
        }
    }

    /// Apply one event. Commands from the wrong state are errors; samples
    /// and ticks outside of tracking are ignored.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Outcome> {
        match event {
            SessionEvent::Start { fix, meta, at } => self.on_start(fix, meta, at),
            SessionEvent::Sample(sample) => Ok(self.on_sample(sample)),
            SessionEvent::Tick(now) => Ok(self.on_tick(now)),
            SessionEvent::Pause(now) => self.on_pause(now),
            SessionEvent::Resume(now) => self.on_resume(now),
            SessionEvent::Stop(now) => self.on_stop(now),
            SessionEvent::Reset => Ok(self.on_reset()),
        }
    }

    /// Fail with `InvalidTransition` unless `command` is allowed right now.
    pub fn ensure_allowed(&self, command: Command) -> Result<()> {
        if command.allowed_from(self.state) {
            Ok(())
        } else {
            Err(TrackerError::InvalidTransition {
                command,
                state: self.state,
            })
        }
    }

    fn on_start(&mut self, fix: RawSample, meta: SessionMeta, at: DateTime<Utc>) -> Result<Outcome> {
        self.ensure_allowed(Command::Start)?;

        let fix = fix.sanitized();
        if !fix.has_position() {
            return Err(TrackerError::LocationUnavailable(
                "initial fix has no usable position".to_string(),
            ));
        }

        self.clear();
        self.smoother.reset(fix.altitude);
        let smoothed = self.smoother.current();
        self.accumulator.seed_altitude(smoothed);

        self.path.push(TrackPoint::from_sample(&fix, smoothed));
        self.last_accepted = Some(fix.clone());
        self.last_sample = Some(fix.clone());
        self.current_position = Some(fix);
        self.meta = Some(meta);
        self.clock.start(at);
        self.state = SessionState::Tracking;

        info!("Tracking started for user {}", self.meta.as_ref().map_or("", |m| m.user_id.as_str()));
        Ok(Outcome::Started)
    }

    fn on_sample(&mut self, sample: RawSample) -> Outcome {
        if self.state != SessionState::Tracking {
            return Outcome::Ignored;
        }

        let sample = sample.sanitized();
        let verdict = self.validator.validate(&sample, self.last_sample.as_ref());

        // Rejected samples still become the validation context for the next
        // one, except when there is no position to compare against.
        if sample.has_position() {
            self.last_sample = Some(sample.clone());
        }

        if let Verdict::Reject(reason) = verdict {
            self.rejected_samples += 1;
            debug!("Rejected sample at {}: {}", sample.timestamp, reason);
            return Outcome::Rejected(reason);
        }

        // Segments use raw altitudes; the smoothed one only drives gain and
        // the stored path vertex.
        let segment_m = self
            .last_accepted
            .as_ref()
            .map_or(0.0, |previous| segment_distance(previous, &sample));
        let smoothed = self.smoother.smooth(sample.altitude);

        self.accumulator.add_segment(segment_m);
        self.accumulator.update_elevation(smoothed);
        let point = TrackPoint::from_sample(&sample, smoothed);
        let appended = self.simplifier.offer(&mut self.path, point, segment_m);

        self.last_accepted = Some(sample.clone());
        self.current_position = Some(sample);
        self.accepted_samples += 1;

        Outcome::Accepted { segment_m, appended }
    }

    fn on_tick(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.state != SessionState::Tracking {
            return Outcome::Ignored;
        }
        Outcome::Ticked {
            elapsed_secs: self.clock.tick(now),
        }
    }

    fn on_pause(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.ensure_allowed(Command::Pause)?;
        self.clock.pause(now);
        self.state = SessionState::Paused;
        info!("Tracking paused at {:.1}s", self.clock.elapsed_secs());
        Ok(Outcome::Paused)
    }

    fn on_resume(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.ensure_allowed(Command::Resume)?;
        self.clock.resume(now);
        self.state = SessionState::Tracking;
        info!("Tracking resumed");
        Ok(Outcome::Resumed)
    }

    fn on_stop(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.ensure_allowed(Command::Stop)?;
        self.clock.stop(now);
        self.state = SessionState::Stopped;

        if self.path.len() <= 1 {
            info!("Tracking stopped without movement, nothing to save");
            return Ok(Outcome::Stopped(None));
        }

        let hike = FinalizedHike {
            meta: self.meta.clone().unwrap_or_default(),
            started_at: self.clock.start_time().unwrap_or(now),
            result: TrackingResult {
                distance_meters: self.accumulator.total_distance_m(),
                elevation_gain_meters: self.accumulator.total_elevation_gain_m(),
                elapsed_seconds: self.clock.elapsed_secs(),
                path: self.path.clone(),
            },
        };
        info!(
            "Tracking stopped: {:.1} m, {:.1} m gain, {} points",
            hike.result.distance_meters,
            hike.result.elevation_gain_meters,
            hike.result.path.len()
        );

        self.result = Some(hike.clone());
        Ok(Outcome::Stopped(Some(hike)))
    }

    fn on_reset(&mut self) -> Outcome {
        if self.state != SessionState::Idle {
            info!("Session reset from {}", self.state);
        }
        self.clear();
        self.state = SessionState::Idle;
        Outcome::Reset
    }

    fn clear(&mut self) {
        self.smoother.reset(None);
        self.accumulator.reset();
        self.clock.reset();
        self.path.clear();
        self.meta = None;
        self.last_sample = None;
        self.last_accepted = None;
        self.current_position = None;
        self.accepted_samples = 0;
        self.rejected_samples = 0;
        self.result = None;
    }

    pub fn start(&mut self, fix: RawSample, meta: SessionMeta, at: DateTime<Utc>) -> Result<Outcome> {
        self.handle(SessionEvent::Start { fix, meta, at })
    }

    pub fn process_sample(&mut self, sample: RawSample) -> Outcome {
        self.on_sample(sample)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Outcome {
        self.on_tick(now)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.handle(SessionEvent::Pause(now))
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.handle(SessionEvent::Resume(now))
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        self.handle(SessionEvent::Stop(now))
    }

    pub fn reset(&mut self) -> Outcome {
        self.on_reset()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed_secs()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.clock.start_time()
    }

    pub fn total_distance_m(&self) -> f64 {
        self.accumulator.total_distance_m()
    }

    pub fn total_elevation_gain_m(&self) -> f64 {
        self.accumulator.total_elevation_gain_m()
    }

    pub fn last_smoothed_altitude(&self) -> Option<f64> {
        self.accumulator.last_smoothed_altitude()
    }

    pub fn last_accepted(&self) -> Option<&RawSample> {
        self.last_accepted.as_ref()
    }

    pub fn current_position(&self) -> Option<&RawSample> {
        self.current_position.as_ref()
    }

    pub fn path(&self) -> &[TrackPoint] {
        &self.path
    }

    pub fn meta(&self) -> Option<&SessionMeta> {
        self.meta.as_ref()
    }

    /// The hike finalized by the last stop, kept until reset.
    pub fn result(&self) -> Option<&FinalizedHike> {
        self.result.as_ref()
    }

    pub fn accepted_samples(&self) -> u64 {
        self.accepted_samples
    }

    pub fn rejected_samples(&self) -> u64 {
        self.rejected_samples
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            started_at: self.clock.start_time(),
            elapsed_seconds: self.clock.elapsed_secs(),
            total_distance_m: self.accumulator.total_distance_m(),
            total_elevation_gain_m: self.accumulator.total_elevation_gain_m(),
            current_position: self.current_position.clone(),
            path_len: self.path.len(),
            accepted_samples: self.accepted_samples,
            rejected_samples: self.rejected_samples,
        }
    }
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn fix(lat: f64, lon: f64, alt: Option<f64>, secs: i64) -> RawSample {
        let mut sample = RawSample::new(lat, lon, at(secs)).with_accuracy(5.0).with_speed(1.0);
        sample.altitude = alt;
        sample
    }

    fn started(settings: SessionSettings) -> TrackingSession {
        let mut session = TrackingSession::new(settings);
        session
            .start(fix(0.0, 0.0, Some(100.0), 0), SessionMeta::new("alice"), t0())
            .unwrap();
        session
    }

    #[test]
    fn test_pause_from_idle_is_invalid() {
        let mut session = TrackingSession::default();
        let err = session.pause(t0()).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidTransition { command: Command::Pause, state: SessionState::Idle }
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_transition_table() {
        use SessionState::*;
        assert!(Command::Start.allowed_from(Idle));
        assert!(!Command::Start.allowed_from(Stopped));
        assert!(Command::Pause.allowed_from(Tracking));
        assert!(!Command::Pause.allowed_from(Paused));
        assert!(Command::Resume.allowed_from(Paused));
        assert!(!Command::Resume.allowed_from(Tracking));
        assert!(Command::Stop.allowed_from(Tracking));
        assert!(Command::Stop.allowed_from(Paused));
        assert!(!Command::Stop.allowed_from(Idle));
        assert!(!Command::Stop.allowed_from(Stopped));
        for state in [Idle, Tracking, Paused, Stopped] {
            assert!(Command::Reset.allowed_from(state));
        }
    }

    #[test]
    fn test_start_seeds_path_and_elevation() {
        let session = started(SessionSettings::default());
        assert_eq!(session.state(), SessionState::Tracking);
        assert_eq!(session.path().len(), 1);
        assert_eq!(session.path()[0].altitude, Some(100.0));
        assert_eq!(session.last_smoothed_altitude(), Some(100.0));
        assert_eq!(session.start_time(), Some(t0()));
        assert_eq!(session.total_distance_m(), 0.0);
    }

    #[test]
    fn test_start_with_malformed_fix_leaves_idle() {
        let mut session = TrackingSession::default();
        let err = session
            .start(RawSample::new(f64::NAN, 0.0, t0()), SessionMeta::new("alice"), t0())
            .unwrap_err();
        assert!(matches!(err, TrackerError::LocationUnavailable(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.path().is_empty());
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut session = started(SessionSettings::default());
        let err = session
            .start(fix(1.0, 1.0, None, 5), SessionMeta::new("bob"), at(5))
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(session.meta().map(|m| m.user_id.as_str()), Some("alice"));
    }

    #[test]
    fn test_round_trip_with_default_smoothing() {
        let mut session = started(SessionSettings::default());
        let outcome = session.process_sample(fix(0.0001, 0.0, Some(105.0), 1));

        // The segment uses the raw 5 m climb
        let horizontal = 11.1195;
        let expected = (horizontal * horizontal + 5.0f64 * 5.0).sqrt();
        match outcome {
            Outcome::Accepted { segment_m, appended } => {
                assert!((segment_m - expected).abs() < 0.01);
                assert!(appended);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!((session.total_distance_m() - 12.19).abs() < 0.01);

        // Gain and the stored vertex follow the mean of [100, 105]
        assert_eq!(session.total_elevation_gain_m(), 2.5);
        assert_eq!(session.path()[1].altitude, Some(102.5));
    }

    #[test]
    fn test_round_trip_without_smoothing() {
        let settings = SessionSettings {
            elevation_window: 1,
            ..Default::default()
        };
        let mut session = started(settings);
        session.process_sample(fix(0.0001, 0.0, Some(105.0), 1));

        assert!((session.total_distance_m() - 12.19).abs() < 0.01);
        assert_eq!(session.total_elevation_gain_m(), 5.0);
        assert_eq!(session.path().len(), 2);
    }

    #[test]
    fn test_rejected_sample_advances_validation_context_only() {
        let mut session = started(SessionSettings::default());
        // ~222 m jump at 1 m/s
        let outlier = fix(0.002, 0.0, Some(100.0), 1);
        assert!(matches!(
            session.process_sample(outlier.clone()),
            Outcome::Rejected(RejectReason::PositionJump { .. })
        ));
        assert_eq!(session.total_distance_m(), 0.0);
        assert_eq!(session.path().len(), 1);
        assert_eq!(session.rejected_samples(), 1);
        assert_eq!(session.current_position().map(|p| p.latitude), Some(0.0));

        // Next to the outlier: validated against it, measured from the seed
        let near_outlier = fix(0.00201, 0.0, Some(100.0), 2);
        match session.process_sample(near_outlier) {
            Outcome::Accepted { segment_m, .. } => assert!(segment_m > 200.0),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_sub_spacing_samples_count_distance_but_not_path() {
        let mut session = started(SessionSettings::default());
        let step = 1.99 / 111_195.0;
        session.process_sample(fix(step, 0.0, Some(100.0), 1));
        session.process_sample(fix(2.0 * step, 0.0, Some(100.0), 2));

        assert_eq!(session.path().len(), 1);
        assert!((session.total_distance_m() - 3.98).abs() < 0.01);
        assert_eq!(session.accepted_samples(), 2);
        assert_eq!(session.current_position().map(|p| p.latitude), Some(2.0 * step));
    }

    #[test]
    fn test_samples_at_spacing_are_retained() {
        let mut session = started(SessionSettings::default());
        let step = 2.0001 / 111_195.0;
        session.process_sample(fix(step, 0.0, Some(100.0), 1));
        session.process_sample(fix(2.0 * step, 0.0, Some(100.0), 2));
        assert_eq!(session.path().len(), 3);
    }

    #[test]
    fn test_pause_isolation() {
        let mut session = started(SessionSettings::default());
        session.process_sample(fix(0.0001, 0.0, Some(105.0), 1));
        session.pause(at(2)).unwrap();

        let before = session.snapshot();
        let path_before = session.path().to_vec();
        assert_eq!(session.process_sample(fix(0.0002, 0.0, Some(120.0), 3)), Outcome::Ignored);
        assert_eq!(session.tick(at(30)), Outcome::Ignored);
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.path(), path_before.as_slice());
    }

    #[test]
    fn test_resume_processes_again() {
        let mut session = started(SessionSettings::default());
        session.pause(at(10)).unwrap();
        session.resume(at(70)).unwrap();
        assert!(matches!(
            session.process_sample(fix(0.0001, 0.0, Some(100.0), 71)),
            Outcome::Accepted { .. }
        ));
        // Active-only accounting: 10 s before the pause, 20 s after
        assert_eq!(session.tick(at(90)), Outcome::Ticked { elapsed_secs: 30.0 });
    }

    #[test]
    fn test_stop_without_movement_produces_nothing() {
        let mut session = started(SessionSettings::default());
        assert_eq!(session.stop(at(5)).unwrap(), Outcome::Stopped(None));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_stop_finalizes_result() {
        let mut session = started(SessionSettings::default());
        session.process_sample(fix(0.0001, 0.0, Some(105.0), 1));
        session.tick(at(1));
        let outcome = session.stop(at(42)).unwrap();

        let Outcome::Stopped(Some(hike)) = outcome else {
            panic!("expected a finalized hike");
        };
        assert_eq!(hike.meta.user_id, "alice");
        assert_eq!(hike.started_at, t0());
        assert_eq!(hike.result.elapsed_seconds, 42.0);
        assert_eq!(hike.result.path.len(), 2);
        assert_eq!(session.result(), Some(&hike));

        // Late samples after stop are dropped
        assert_eq!(session.process_sample(fix(0.0002, 0.0, None, 43)), Outcome::Ignored);
        assert!(session.stop(at(50)).unwrap_err().is_invalid_transition());
    }

    #[test]
    fn test_stop_from_paused_keeps_frozen_time() {
        let mut session = started(SessionSettings::default());
        session.process_sample(fix(0.0001, 0.0, Some(105.0), 1));
        session.pause(at(20)).unwrap();
        let Outcome::Stopped(Some(hike)) = session.stop(at(500)).unwrap() else {
            panic!("expected a finalized hike");
        };
        assert_eq!(hike.result.elapsed_seconds, 20.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = started(SessionSettings::default());
        for i in 1..=5 {
            session.process_sample(fix(0.0001 * i as f64, 0.0, Some(100.0 + 3.0 * i as f64), i));
        }
        assert!(session.total_distance_m() > 0.0);
        assert!(session.total_elevation_gain_m() > 0.0);
        assert_eq!(session.path().len(), 6);

        assert_eq!(session.reset(), Outcome::Reset);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.total_distance_m(), 0.0);
        assert_eq!(session.total_elevation_gain_m(), 0.0);
        assert!(session.path().is_empty());
        assert!(session.last_accepted().is_none());
        assert!(session.last_smoothed_altitude().is_none());
        assert!(session.current_position().is_none());
        assert_eq!(session.elapsed_seconds(), 0.0);

        // A new session can start straight away
        session
            .start(fix(1.0, 1.0, None, 100), SessionMeta::new("bob"), at(100))
            .unwrap();
        assert_eq!(session.path().len(), 1);
    }

    #[test]
    fn test_monotonic_totals() {
        let mut session = started(SessionSettings::default());
        let altitudes = [100.0, 104.0, 98.0, 110.0, 90.0, 130.0, f64::NAN, 131.0];
        let mut last = (0.0, 0.0);
        for (i, alt) in altitudes.iter().enumerate() {
            let i = i as i64 + 1;
            session.process_sample(fix(0.00003 * i as f64, 0.00001 * i as f64, Some(*alt), i));
            let now = (session.total_distance_m(), session.total_elevation_gain_m());
            assert!(now.0 >= last.0 && now.1 >= last.1);
            assert!(now.0.is_finite() && now.1.is_finite());
            last = now;
        }
    }
}
