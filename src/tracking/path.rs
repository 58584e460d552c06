// src/tracking/path.rs
//! Path simplification for the retained track

use crate::gps::data::TrackPoint;

/// Decides which accepted samples become path vertices.
///
/// Only the retained path is thinned; distance totals still see every
/// accepted sample.
#[derive(Debug, Clone)]
pub struct PathSimplifier {
    min_spacing_m: f64,
}

impl PathSimplifier {
    pub fn new(min_spacing_m: f64) -> Self {
        Self {
            min_spacing_m: min_spacing_m.max(0.0),
        }
    }

    pub fn min_spacing_m(&self) -> f64 {
        self.min_spacing_m
    }

    /// Keep a point whose segment from the previous accepted sample is at
    /// least the minimum spacing.
    pub fn should_append(&self, segment_m: f64) -> bool {
        segment_m.is_finite() && segment_m >= self.min_spacing_m
    }

    /// Append `point` to `path` if it qualifies. Returns whether it was added.
    pub fn offer(&self, path: &mut Vec<TrackPoint>, point: TrackPoint, segment_m: f64) -> bool {
        if self.should_append(segment_m) {
            path.push(point);
            true
        } else {
            false
        }
    }
}

impl Default for PathSimplifier {
    fn default() -> Self {
        Self::new(2.0)
    }
}
