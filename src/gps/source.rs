// src/gps/source.rs
//! Location source abstraction and subscription handling

use super::data::RawSample;
use crate::error::Result;
use chrono::Duration as ChronoDuration;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Delivery constraints for a continuous subscription
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscribeOptions {
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1000),
            min_distance_m: 0.0,
        }
    }
}

/// Anything that can produce location fixes.
///
/// A source is asked for a single fix when a session starts and then
/// subscribed to for a stream of fixes. Samples are pushed into the given
/// channel until the returned [`Subscription`] is cancelled or dropped.
pub trait LocationSource {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Obtain one current fix.
    fn current_fix(&mut self) -> impl Future<Output = Result<RawSample>> + Send;

    /// Start delivering samples into `tx`.
    fn subscribe(
        &mut self,
        options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription>;
}

/// Handle to a running sample feed. Cancelling is immediate and idempotent.
pub struct Subscription {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn a feed task. The task receives the running flag and should stop
    /// once it reads `false`.
    pub fn spawn<F, Fut>(feed: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(feed(Arc::clone(&running)));
        Self {
            running,
            task: Some(task),
        }
    }

    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.task.as_ref().map_or(false, |task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Applies [`SubscribeOptions`] to a raw feed.
///
/// Intervals are measured on sample timestamps. A sample stamped earlier
/// than the last one passes through untouched; ordering problems are left to
/// the validator.
#[derive(Debug, Clone)]
pub struct Throttle {
    options: SubscribeOptions,
    last_emitted: Option<RawSample>,
}

impl Throttle {
    pub fn new(options: SubscribeOptions) -> Self {
        Self {
            options,
            last_emitted: None,
        }
    }

    /// Returns whether `sample` should be delivered, and remembers it if so.
    pub fn admit(&mut self, sample: &RawSample) -> bool {
        if let Some(last) = &self.last_emitted {
            let min_interval = ChronoDuration::from_std(self.options.min_interval)
                .unwrap_or_else(|_| ChronoDuration::zero());
            let gap = sample.timestamp.signed_duration_since(last.timestamp);
            if gap >= ChronoDuration::zero() && gap < min_interval {
                return false;
            }
            if self.options.min_distance_m > 0.0
                && sample.distance_to(last) < self.options.min_distance_m
            {
                return false;
            }
        }
        self.last_emitted = Some(sample.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(millis: i64, lat: f64) -> RawSample {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        RawSample::new(lat, 8.0, t0 + ChronoDuration::milliseconds(millis))
    }

    #[test]
    fn test_throttle_min_interval() {
        let mut throttle = Throttle::new(SubscribeOptions::default());
        assert!(throttle.admit(&at(0, 46.0)));
        assert!(!throttle.admit(&at(400, 46.0)));
        assert!(throttle.admit(&at(1000, 46.0)));
        assert!(!throttle.admit(&at(1999, 46.0)));
    }

    #[test]
    fn test_throttle_min_distance() {
        let mut throttle = Throttle::new(SubscribeOptions {
            min_interval: Duration::ZERO,
            min_distance_m: 5.0,
        });
        assert!(throttle.admit(&at(0, 46.0)));
        // ~1.1 m
        assert!(!throttle.admit(&at(1000, 46.00001)));
        // ~11 m
        assert!(throttle.admit(&at(2000, 46.0001)));
    }

    #[test]
    fn test_throttle_passes_out_of_order() {
        let mut throttle = Throttle::new(SubscribeOptions::default());
        assert!(throttle.admit(&at(5000, 46.0)));
        assert!(throttle.admit(&at(1000, 46.0)));
    }

    #[tokio::test]
    async fn test_subscription_cancel_stops_feed() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut subscription = Subscription::spawn(move |running| async move {
            let mut n = 0.0;
            while running.load(Ordering::Relaxed) {
                n += 0.0001;
                if tx.send(at(0, n)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        assert!(rx.recv().await.is_some());
        subscription.cancel();
        assert!(!subscription.is_active());

        // Drain what was in flight; the sender is gone once the task is aborted
        while rx.recv().await.is_some() {}
    }
}
