// src/tracking/mod.rs
//! Turning a stream of raw samples into a hike: validation, smoothing,
//! distance, path and elapsed time

pub mod clock;
pub mod distance;
pub mod elevation;
pub mod path;
pub mod result;
pub mod session;
pub mod validator;

pub use clock::{ElapsedClock, PauseAccounting};
pub use result::{FinalizedHike, SessionMeta, TrackingResult};
pub use session::{
    Command, Outcome, SessionEvent, SessionSettings, SessionSnapshot, SessionState, TrackingSession,
};
pub use validator::{RejectReason, SampleValidator, ValidatorLimits, Verdict};
