// src/tracker.rs
//! Async driver coordinating a session with its location source, clock and sink
//!
//! [`HikeTracker`] is the single writer of a [`TrackingSession`]. Commands,
//! samples and clock ticks are all funnelled through it, either by calling
//! its methods directly or by running it as a task with [`HikeTracker::spawn`]
//! and talking to it through a [`TrackerHandle`].

use crate::{
    error::{Result, TrackerError},
    gps::{
        data::RawSample,
        source::{LocationSource, SubscribeOptions, Subscription},
    },
    sink::PersistenceSink,
    tracking::{
        result::{FinalizedHike, SessionMeta},
        session::{Command, Outcome, SessionSettings, SessionSnapshot, SessionState, TrackingSession},
    },
};
use chrono::{DateTime, Utc};
use std::{
    sync::{Arc, RwLock},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{timeout, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Where the tracker takes "now" from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBase {
    /// System clock, with the session clock ticking on an interval
    #[default]
    WallClock,
    /// Timestamps of the samples themselves; the clock advances on every
    /// sample instead of on an interval. Used for replaying recordings.
    SampleTimestamps,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub session: SessionSettings,
    pub subscribe: SubscribeOptions,
    pub fix_timeout: Duration,
    pub tick_interval: Duration,
    pub channel_capacity: usize,
    pub time_base: TimeBase,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            subscribe: SubscribeOptions::default(),
            fix_timeout: Duration::from_secs(10),
            tick_interval: Duration::from_millis(100),
            channel_capacity: 64,
            time_base: TimeBase::WallClock,
        }
    }
}

/// Messages accepted by a running tracker. Every command carries the
/// channel its result is sent back on.
#[derive(Debug)]
pub enum TrackerCommand {
    Start {
        meta: SessionMeta,
        reply: oneshot::Sender<Result<Outcome>>,
    },
    Pause {
        reply: oneshot::Sender<Result<Outcome>>,
    },
    Resume {
        reply: oneshot::Sender<Result<Outcome>>,
    },
    Stop {
        reply: oneshot::Sender<Result<Option<FinalizedHike>>>,
    },
    Reset {
        reply: oneshot::Sender<Outcome>,
    },
}

pub struct HikeTracker<S, P> {
    source: S,
    sink: P,
    session: TrackingSession,
    settings: TrackerSettings,
    subscription: Option<Subscription>,
    samples: Option<mpsc::Receiver<RawSample>>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    last_sample_time: Option<DateTime<Utc>>,
}

impl<S, P> HikeTracker<S, P>
where
    S: LocationSource,
    P: PersistenceSink,
{
    pub fn new(source: S, sink: P, settings: TrackerSettings) -> Self {
        Self {
            source,
            sink,
            session: TrackingSession::new(settings.session.clone()),
            settings,
            subscription: None,
            samples: None,
            snapshot: Arc::new(RwLock::new(SessionSnapshot::default())),
            last_sample_time: None,
        }
    }

    /// Begin a session: take one fix, subscribe, then start the clock.
    ///
    /// Any failure along the way leaves the session idle.
    pub async fn start(&mut self, meta: SessionMeta) -> Result<Outcome> {
        self.session.ensure_allowed(Command::Start)?;

        info!("Requesting current fix from {}", self.source.name());
        let fix = match timeout(self.settings.fix_timeout, self.source.current_fix()).await {
            Ok(Ok(fix)) => fix.sanitized(),
            Ok(Err(TrackerError::LocationUnavailable(reason))) => {
                return Err(TrackerError::LocationUnavailable(reason));
            }
            Ok(Err(e)) => return Err(TrackerError::LocationUnavailable(e.to_string())),
            Err(_) => {
                return Err(TrackerError::LocationUnavailable(format!(
                    "no fix from {} within {:?}",
                    self.source.name(),
                    self.settings.fix_timeout
                )));
            }
        };

        if !fix.has_position() {
            return Err(TrackerError::LocationUnavailable(
                "initial fix has no usable position".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let subscription = self
            .source
            .subscribe(self.settings.subscribe, tx)
            .map_err(|e| TrackerError::LocationUnavailable(format!("subscription failed: {}", e)))?;

        let at = match self.settings.time_base {
            TimeBase::WallClock => Utc::now(),
            TimeBase::SampleTimestamps => {
                self.last_sample_time = Some(fix.timestamp);
                fix.timestamp
            }
        };

        // A failed transition drops the subscription, which cancels it
        let outcome = self.session.start(fix, meta, at)?;
        self.subscription = Some(subscription);
        self.samples = Some(rx);
        self.publish();
        Ok(outcome)
    }

    /// Freeze the clock. The feed keeps running but its samples are ignored.
    pub fn pause(&mut self) -> Result<Outcome> {
        let outcome = self.session.pause(self.now())?;
        self.publish();
        Ok(outcome)
    }

    pub fn resume(&mut self) -> Result<Outcome> {
        let outcome = self.session.resume(self.now())?;
        self.publish();
        Ok(outcome)
    }

    /// Unsubscribe, finalize and hand the hike to the sink.
    ///
    /// Returns `None` when the session never moved past its first fix. If the
    /// sink fails the session still ends up stopped and the hike stays
    /// available through [`TrackingSession::result`].
    pub async fn stop(&mut self) -> Result<Option<FinalizedHike>> {
        self.session.ensure_allowed(Command::Stop)?;
        self.unsubscribe();

        let outcome = self.session.stop(self.now())?;
        self.publish();

        let Outcome::Stopped(Some(hike)) = outcome else {
            return Ok(None);
        };

        self.sink.persist(&hike).await.map_err(|e| match e {
            TrackerError::Persistence(reason) => TrackerError::Persistence(reason),
            other => TrackerError::Persistence(other.to_string()),
        })?;

        Ok(Some(hike))
    }

    /// Drop everything and return to idle. Nothing is persisted.
    pub fn reset(&mut self) -> Outcome {
        self.unsubscribe();
        self.last_sample_time = None;
        let outcome = self.session.reset();
        self.publish();
        outcome
    }

    /// Feed one sample into the session.
    pub fn process_sample(&mut self, sample: RawSample) -> Outcome {
        if self.settings.time_base == TimeBase::SampleTimestamps {
            self.last_sample_time = Some(match self.last_sample_time {
                Some(last) if last > sample.timestamp => last,
                _ => sample.timestamp,
            });
        }

        let outcome = self.session.process_sample(sample);

        if self.settings.time_base == TimeBase::SampleTimestamps
            && self.session.state() == SessionState::Tracking
        {
            self.session.tick(self.now());
        }

        self.publish();
        outcome
    }

    /// Advance the session clock to now.
    pub fn tick(&mut self) -> Outcome {
        let outcome = self.session.tick(self.now());
        self.publish();
        outcome
    }

    /// Process every sample already waiting in the feed without blocking.
    pub fn process_pending(&mut self) -> usize {
        let Some(mut rx) = self.samples.take() else {
            return 0;
        };

        let mut processed = 0;
        while let Ok(sample) = rx.try_recv() {
            self.process_sample(sample);
            processed += 1;
        }

        self.samples = Some(rx);
        processed
    }

    /// Process samples until the source closes its feed.
    pub async fn drain_feed(&mut self) -> usize {
        let Some(mut rx) = self.samples.take() else {
            return 0;
        };

        let mut processed = 0;
        while let Some(sample) = rx.recv().await {
            self.process_sample(sample);
            processed += 1;
        }

        debug!("Feed from {} closed after {} samples", self.source.name(), processed);
        processed
    }

    /// Shared view of the latest snapshot, refreshed after every change.
    pub fn snapshot_handle(&self) -> Arc<RwLock<SessionSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().map_or(false, Subscription::is_active)
    }

    /// Serve commands, samples and clock ticks until every command sender is gone.
    ///
    /// Commands are always looked at first so that nothing delivered after a
    /// pause or stop sneaks in ahead of it.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<TrackerCommand>) {
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let ticking = self.settings.time_base == TimeBase::WallClock
                && self.session.state() == SessionState::Tracking;

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.dispatch(command).await,
                    None => break,
                },

                sample = next_sample(&mut self.samples) => match sample {
                    Some(sample) => {
                        self.process_sample(sample);
                    }
                    None => {
                        warn!("Location feed from {} ended", self.source.name());
                        self.samples = None;
                    }
                },

                _ = ticker.tick(), if ticking => {
                    self.tick();
                }
            }
        }

        self.unsubscribe();
        debug!("Tracker loop finished");
    }

    async fn dispatch(&mut self, command: TrackerCommand) {
        // A dropped reply channel only means the caller stopped waiting
        match command {
            TrackerCommand::Start { meta, reply } => {
                let _ = reply.send(self.start(meta).await);
            }
            TrackerCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            TrackerCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            TrackerCommand::Stop { reply } => {
                let _ = reply.send(self.stop().await);
            }
            TrackerCommand::Reset { reply } => {
                let _ = reply.send(self.reset());
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        match self.settings.time_base {
            TimeBase::WallClock => Utc::now(),
            TimeBase::SampleTimestamps => self.last_sample_time.unwrap_or_else(Utc::now),
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            debug!("Unsubscribed from {}", self.source.name());
        }
        // Anything still queued is dropped with the receiver
        self.samples = None;
    }

    fn publish(&self) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            *snapshot = self.session.snapshot();
        }
    }
}

impl<S, P> HikeTracker<S, P>
where
    S: LocationSource + Send + 'static,
    P: PersistenceSink + Send + 'static,
{
    /// Run the tracker on its own task.
    ///
    /// The task ends once every clone of the handle is dropped and hands the
    /// tracker back through the join handle.
    pub fn spawn(mut self) -> (TrackerHandle, JoinHandle<Self>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = TrackerHandle {
            commands: tx,
            snapshot: self.snapshot_handle(),
        };
        let task = tokio::spawn(async move {
            self.run(rx).await;
            self
        });
        (handle, task)
    }
}

async fn next_sample(samples: &mut Option<mpsc::Receiver<RawSample>>) -> Option<RawSample> {
    match samples {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Cloneable front end to a spawned [`HikeTracker`]
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl TrackerHandle {
    pub async fn start(&self, meta: SessionMeta) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Start { meta, reply }).await?;
        rx.await.map_err(|_| tracker_gone())?
    }

    pub async fn pause(&self) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Pause { reply }).await?;
        rx.await.map_err(|_| tracker_gone())?
    }

    pub async fn resume(&self) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Resume { reply }).await?;
        rx.await.map_err(|_| tracker_gone())?
    }

    pub async fn stop(&self) -> Result<Option<FinalizedHike>> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Stop { reply }).await?;
        rx.await.map_err(|_| tracker_gone())?
    }

    pub async fn reset(&self) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerCommand::Reset { reply }).await?;
        rx.await.map_err(|_| tracker_gone())
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot
            .read()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default()
    }

    pub fn snapshot_handle(&self) -> Arc<RwLock<SessionSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    async fn send(&self, command: TrackerCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| tracker_gone())
    }
}

fn tracker_gone() -> TrackerError {
    TrackerError::Other("tracker task has stopped".to_string())
}
