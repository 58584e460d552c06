// src/tracking/validator.rs
//! Plausibility checks for incoming location samples

use crate::gps::data::RawSample;
use std::fmt;

/// Thresholds used by [`SampleValidator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorLimits {
    pub max_accuracy_m: f64,
    pub max_speed_mps: f64,
    pub fallback_speed_mps: f64,
    pub speed_window_secs: f64,
    pub min_jump_m: f64,
}

impl Default for ValidatorLimits {
    fn default() -> Self {
        Self {
            max_accuracy_m: 100.0,
            max_speed_mps: 50.0,
            fallback_speed_mps: 15.0,
            speed_window_secs: 5.0,
            min_jump_m: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Latitude/longitude missing, non-finite or out of range
    MalformedPosition,
    PoorAccuracy { accuracy_m: f64 },
    ExcessiveSpeed { speed_mps: f64 },
    PositionJump { distance_m: f64, max_distance_m: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedPosition => write!(f, "malformed position"),
            RejectReason::PoorAccuracy { accuracy_m } => {
                write!(f, "poor accuracy ({:.1} m)", accuracy_m)
            }
            RejectReason::ExcessiveSpeed { speed_mps } => {
                write!(f, "excessive speed ({:.1} m/s)", speed_mps)
            }
            RejectReason::PositionJump { distance_m, max_distance_m } => write!(
                f,
                "position jump ({:.1} m, allowed {:.1} m)",
                distance_m, max_distance_m
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Rejects samples that cannot physically belong to a hike.
#[derive(Debug, Clone, Default)]
pub struct SampleValidator {
    limits: ValidatorLimits,
}

impl SampleValidator {
    pub fn new(limits: ValidatorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidatorLimits {
        &self.limits
    }

    /// Check `sample` against the previous sample seen by the session.
    ///
    /// The speed and jump checks only run when there is a previous sample
    /// and the new one reports a speed. A jump is only rejected when it is
    /// both faster than the reported speed allows and longer than
    /// `min_jump_m`, so short hops are always tolerated.
    pub fn validate(&self, sample: &RawSample, previous: Option<&RawSample>) -> Verdict {
        if !sample.has_position() {
            return Verdict::Reject(RejectReason::MalformedPosition);
        }

        if let Some(accuracy) = sample.accuracy.filter(|a| a.is_finite()) {
            if accuracy > self.limits.max_accuracy_m {
                return Verdict::Reject(RejectReason::PoorAccuracy { accuracy_m: accuracy });
            }
        }

        let speed = sample.speed.filter(|s| s.is_finite());
        if let (Some(previous), Some(speed)) = (previous, speed) {
            if speed > self.limits.max_speed_mps {
                return Verdict::Reject(RejectReason::ExcessiveSpeed { speed_mps: speed });
            }

            let distance = sample.distance_to(previous);
            // A reported speed of zero still gets the walking allowance
            let reference_speed = if speed > 0.0 { speed } else { self.limits.fallback_speed_mps };
            let max_distance = reference_speed * self.limits.speed_window_secs;

            if distance > max_distance && distance > self.limits.min_jump_m {
                return Verdict::Reject(RejectReason::PositionJump {
                    distance_m: distance,
                    max_distance_m: max_distance,
                });
            }
        }

        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(lat: f64, lon: f64) -> RawSample {
        RawSample::new(lat, lon, Utc::now())
    }

    #[test]
    fn test_accuracy_threshold() {
        let validator = SampleValidator::default();
        let ok = sample(46.0, 8.0).with_accuracy(100.0);
        let bad = sample(46.0, 8.0).with_accuracy(101.0);

        assert_eq!(validator.validate(&ok, None), Verdict::Accept);
        assert_eq!(
            validator.validate(&bad, None),
            Verdict::Reject(RejectReason::PoorAccuracy { accuracy_m: 101.0 })
        );
    }

    #[test]
    fn test_malformed_position() {
        let validator = SampleValidator::default();
        let bad = sample(f64::NAN, 8.0);
        assert_eq!(
            validator.validate(&bad, None),
            Verdict::Reject(RejectReason::MalformedPosition)
        );
    }

    #[test]
    fn test_speed_limit_needs_previous_sample() {
        let validator = SampleValidator::default();
        let fast = sample(46.0, 8.0).with_speed(60.0);
        assert!(validator.validate(&fast, None).is_accepted());

        let previous = sample(46.0, 8.0);
        assert_eq!(
            validator.validate(&fast, Some(&previous)),
            Verdict::Reject(RejectReason::ExcessiveSpeed { speed_mps: 60.0 })
        );
    }

    #[test]
    fn test_speed_checks_skipped_without_reported_speed() {
        let validator = SampleValidator::default();
        let previous = sample(46.0, 8.0);
        // ~11 km away but no speed reported
        let far = sample(46.1, 8.0);
        assert!(validator.validate(&far, Some(&previous)).is_accepted());
    }

    #[test]
    fn test_large_jump_rejected() {
        let validator = SampleValidator::default();
        let previous = sample(46.0, 8.0);
        // ~222 m in one sample at a reported 1 m/s (allowance 5 m)
        let jumped = sample(46.002, 8.0).with_speed(1.0);
        match validator.validate(&jumped, Some(&previous)) {
            Verdict::Reject(RejectReason::PositionJump { distance_m, max_distance_m }) => {
                assert!(distance_m > 200.0);
                assert_eq!(max_distance_m, 5.0);
            }
            other => panic!("expected jump rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_small_jump_tolerated_even_if_too_fast() {
        let validator = SampleValidator::default();
        let previous = sample(46.0, 8.0);
        // ~55 m at 1 m/s: over the allowance but under the jump floor
        let hop = sample(46.0005, 8.0).with_speed(1.0);
        assert!(validator.validate(&hop, Some(&previous)).is_accepted());
    }

    #[test]
    fn test_zero_speed_uses_fallback_allowance() {
        let validator = SampleValidator::default();
        let previous = sample(46.0, 8.0);
        // ~67 m: within 15 m/s * 5 s
        let stationary = sample(46.0006, 8.0).with_speed(0.0);
        assert!(validator.validate(&stationary, Some(&previous)).is_accepted());

        // ~111 m: beyond both the 75 m allowance and the 100 m floor
        let jumped = sample(46.001, 8.0).with_speed(0.0);
        assert!(!validator.validate(&jumped, Some(&previous)).is_accepted());
    }
}
