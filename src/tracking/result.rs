// src/tracking/result.rs
//! Finalized output of a tracking session

use crate::gps::data::TrackPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifiers supplied by the caller at start. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub user_id: String,
    #[serde(default)]
    pub trail_id: Option<String>,
    #[serde(default)]
    pub trail_name: Option<String>,
}

impl SessionMeta {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            trail_id: None,
            trail_name: None,
        }
    }

    pub fn with_trail_id(mut self, trail_id: impl Into<String>) -> Self {
        self.trail_id = Some(trail_id.into());
        self
    }

    pub fn with_trail_name(mut self, trail_name: impl Into<String>) -> Self {
        self.trail_name = Some(trail_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResult {
    pub distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub elapsed_seconds: f64,
    pub path: Vec<TrackPoint>,
}

/// What the persistence sink receives on stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedHike {
    pub meta: SessionMeta,
    pub started_at: DateTime<Utc>,
    pub result: TrackingResult,
}

impl FinalizedHike {
    /// Average pace over the hike in km/h, if any time elapsed.
    pub fn average_speed_kmh(&self) -> Option<f64> {
        if self.result.elapsed_seconds > 0.0 {
            Some(self.result.distance_meters / self.result.elapsed_seconds * 3.6)
        } else {
            None
        }
    }

    pub fn format_duration(&self) -> String {
        format_duration(self.result.elapsed_seconds)
    }
}

/// Render seconds as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as i64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5.9), "5s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3723.0), "1h 2m 3s");
    }

    #[test]
    fn test_average_speed() {
        let hike = FinalizedHike {
            meta: SessionMeta::new("alice"),
            started_at: Utc::now(),
            result: TrackingResult {
                distance_meters: 5000.0,
                elevation_gain_meters: 300.0,
                elapsed_seconds: 3600.0,
                path: Vec::new(),
            },
        };
        assert_eq!(hike.average_speed_kmh(), Some(5.0));
    }

    #[test]
    fn test_result_json_field_names() {
        let result = TrackingResult {
            distance_meters: 1.0,
            elevation_gain_meters: 2.0,
            elapsed_seconds: 3.0,
            path: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["distanceMeters"], 1.0);
        assert_eq!(json["elevationGainMeters"], 2.0);
        assert_eq!(json["elapsedSeconds"], 3.0);
    }
}
