// src/lib.rs
//! Hike Tracker Library
//!
//! Turns a noisy stream of location fixes into a hiking record: distance,
//! elevation gain, elapsed time and a simplified path, with pause, resume,
//! stop and reset control. Fixes come from gpsd, a serial NMEA receiver or a
//! recorded sample file.

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod gps;
pub mod sink;
pub mod tracker;
pub mod tracking;

// Re-export main types for convenience
pub use error::{Result, TrackerError};
pub use gps::data::{RawSample, TrackPoint};
pub use sink::{FileSink, MemorySink, PersistenceSink};
pub use tracker::{HikeTracker, TimeBase, TrackerHandle, TrackerSettings};
pub use tracking::{
    FinalizedHike, Outcome, SessionMeta, SessionSnapshot, SessionState, TrackingResult, TrackingSession,
};
