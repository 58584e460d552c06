// src/gps/replay.rs
//! Recorded and hand-fed location sources

use super::{
    data::RawSample,
    source::{LocationSource, SubscribeOptions, Subscription, Throttle},
};
use crate::error::{Result, TrackerError};
use std::{
    collections::VecDeque,
    path::Path,
    sync::{atomic::Ordering, Arc, Mutex},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Plays back a list of samples.
///
/// The first sample answers the one-shot fix request; the rest are streamed
/// to the subscriber, optionally paced, and the feed closes at the end.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    samples: VecDeque<RawSample>,
    pace: Option<Duration>,
}

impl ReplaySource {
    pub fn from_samples(samples: Vec<RawSample>) -> Self {
        Self {
            samples: samples.into(),
            pace: None,
        }
    }

    /// Load a JSON-lines file, one sample per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let samples = parse_samples(&contents)?;
        info!("Loaded {} samples from {}", samples.len(), path.display());
        Ok(Self::from_samples(samples))
    }

    /// Delay between streamed samples; `None` streams as fast as the
    /// consumer reads.
    pub fn with_pace(mut self, pace: Option<Duration>) -> Self {
        self.pace = pace;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

/// Parse JSON-lines sample data
pub fn parse_samples(contents: &str) -> Result<Vec<RawSample>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str::<RawSample>(line)
                .map_err(|e| TrackerError::Parse(format!("line {}: {}", index + 1, e)))
        })
        .collect()
}

impl LocationSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn current_fix(&mut self) -> Result<RawSample> {
        self.samples
            .pop_front()
            .ok_or_else(|| TrackerError::LocationUnavailable("replay has no samples left".to_string()))
    }

    fn subscribe(
        &mut self,
        options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription> {
        let samples: Vec<RawSample> = self.samples.drain(..).collect();
        let pace = self.pace;

        Ok(Subscription::spawn(move |running| async move {
            let mut throttle = Throttle::new(options);
            for sample in samples {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                if !throttle.admit(&sample) {
                    continue;
                }
                if tx.send(sample).await.is_err() {
                    break;
                }
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
            debug!("Replay feed finished");
        }))
    }
}

type FeedSlot = Arc<Mutex<Option<mpsc::Sender<RawSample>>>>;

/// A source fed by hand through a [`ManualFeed`].
///
/// Useful for driving a tracker with synthetic samples: push a sample and it
/// is delivered to whichever subscription is currently live.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    fix: Option<RawSample>,
    slot: FeedSlot,
}

/// Sending half of a [`ManualSource`]
#[derive(Debug, Clone)]
pub struct ManualFeed {
    slot: FeedSlot,
}

impl ManualSource {
    /// `fix` answers every one-shot request; `None` makes start fail.
    pub fn new(fix: Option<RawSample>) -> (Self, ManualFeed) {
        let slot: FeedSlot = Arc::new(Mutex::new(None));
        let feed = ManualFeed {
            slot: Arc::clone(&slot),
        };
        (Self { fix, slot }, feed)
    }

    pub fn set_fix(&mut self, fix: Option<RawSample>) {
        self.fix = fix;
    }
}

impl ManualFeed {
    /// Deliver a sample. Returns `false` if nobody is subscribed.
    pub async fn push(&self, sample: RawSample) -> bool {
        let tx = self.slot.lock().ok().and_then(|slot| slot.as_ref().cloned());
        match tx {
            Some(tx) => tx.send(sample).await.is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.as_ref().map_or(false, |tx| !tx.is_closed()))
            .unwrap_or(false)
    }
}

/// Empties the feed slot when the subscription task goes away
struct ClearSlot(FeedSlot);

impl Drop for ClearSlot {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.0.lock() {
            slot.take();
        }
    }
}

impl LocationSource for ManualSource {
    fn name(&self) -> &str {
        "manual"
    }

    async fn current_fix(&mut self) -> Result<RawSample> {
        self.fix
            .clone()
            .ok_or_else(|| TrackerError::LocationUnavailable("location permission denied".to_string()))
    }

    fn subscribe(
        &mut self,
        _options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(tx);
        }
        let slot = Arc::clone(&self.slot);

        Ok(Subscription::spawn(move |_running| async move {
            let _clear = ClearSlot(slot);
            std::future::pending::<()>().await;
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const LINES: &str = r#"
# morning loop
{"latitude":46.0,"longitude":8.0,"altitude":1500.0,"accuracy":4.0,"speed":1.1,"timestamp":"2024-06-01T08:00:00Z"}
{"latitude":46.0001,"longitude":8.0,"altitude":1501.0,"accuracy":4.0,"speed":1.1,"timestamp":"2024-06-01T08:00:10Z"}

{"latitude":46.0002,"longitude":8.0,"timestamp":"2024-06-01T08:00:20Z"}
"#;

    #[test]
    fn test_parse_samples_skips_comments_and_blanks() {
        let samples = parse_samples(LINES).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].altitude, None);
    }

    #[test]
    fn test_parse_samples_reports_line() {
        let err = parse_samples("{\"latitude\":1.0}\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_replay_fix_then_stream() {
        let mut source = ReplaySource::from_samples(parse_samples(LINES).unwrap());
        let fix = source.current_fix().await.unwrap();
        assert_eq!(fix.latitude, 46.0);

        let (tx, mut rx) = mpsc::channel(4);
        let _subscription = source.subscribe(SubscribeOptions::default(), tx).unwrap();
        let mut received = Vec::new();
        while let Some(sample) = rx.recv().await {
            received.push(sample.latitude);
        }
        assert_eq!(received, vec![46.0001, 46.0002]);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_manual_source() {
        let (mut source, feed) = ManualSource::new(None);
        assert!(matches!(
            source.current_fix().await,
            Err(TrackerError::LocationUnavailable(_))
        ));
        assert!(!feed.push(RawSample::new(1.0, 1.0, Utc::now())).await);

        source.set_fix(Some(RawSample::new(1.0, 1.0, Utc::now())));
        assert!(source.current_fix().await.is_ok());

        let (tx, mut rx) = mpsc::channel(4);
        let mut subscription = source.subscribe(SubscribeOptions::default(), tx).unwrap();
        assert!(feed.is_subscribed());
        assert!(feed.push(RawSample::new(2.0, 2.0, Utc::now())).await);
        assert_eq!(rx.recv().await.map(|s| s.latitude), Some(2.0));

        subscription.cancel();
        drop(rx);
        assert!(!feed.push(RawSample::new(3.0, 3.0, Utc::now())).await);
    }
}
