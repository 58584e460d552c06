// src/gps/data.rs
//! Location sample structures and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracking::distance::haversine_distance;

/// A single reading from a location source.
///
/// Optional fields are `None` when the receiver did not report them. Values
/// that arrive as NaN or infinity are dropped by [`RawSample::sanitized`], so
/// downstream math never sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub latitude: f64,             // degrees
    pub longitude: f64,            // degrees
    #[serde(default)]
    pub altitude: Option<f64>,     // meters
    #[serde(default)]
    pub accuracy: Option<f64>,     // horizontal, meters
    #[serde(default)]
    pub speed: Option<f64>,        // m/s
    pub timestamp: DateTime<Utc>,
}

impl RawSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Treat every non-finite optional field as absent.
    pub fn sanitized(mut self) -> Self {
        self.altitude = self.altitude.filter(|v| v.is_finite());
        self.accuracy = self.accuracy.filter(|v| v.is_finite());
        self.speed = self.speed.filter(|v| v.is_finite());
        self
    }

    /// Latitude and longitude are finite and within their ranges.
    pub fn has_position(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Horizontal great-circle distance to another sample in meters.
    pub fn distance_to(&self, other: &RawSample) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// A retained vertex of the recorded path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,     // smoothed, meters
    pub timestamp: DateTime<Utc>,
}

impl TrackPoint {
    pub fn from_sample(sample: &RawSample, smoothed_altitude: Option<f64>) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: smoothed_altitude,
            timestamp: sample.timestamp,
        }
    }

    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}
