// src/tracking/distance.rs
//! Segment distances and running distance / elevation totals

use crate::gps::data::RawSample;

/// Mean Earth radius used for the spherical approximation, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two accepted samples.
///
/// Uses the horizontal and vertical legs when both samples carry a raw
/// altitude, and the horizontal distance alone otherwise.
pub fn segment_distance(from: &RawSample, to: &RawSample) -> f64 {
    let horizontal = from.distance_to(to);
    match (from.altitude, to.altitude) {
        (Some(a1), Some(a2)) => {
            let vertical = (a2 - a1).abs();
            (horizontal * horizontal + vertical * vertical).sqrt()
        }
        _ => horizontal,
    }
}

/// Running totals for a session.
///
/// Both totals only ever grow; [`DistanceAccumulator::reset`] is the one way
/// back to zero.
#[derive(Debug, Clone)]
pub struct DistanceAccumulator {
    total_distance_m: f64,
    total_elevation_gain_m: f64,
    last_smoothed_altitude: Option<f64>,
    min_gain_m: f64,
}

impl DistanceAccumulator {
    pub fn new(min_gain_m: f64) -> Self {
        Self {
            total_distance_m: 0.0,
            total_elevation_gain_m: 0.0,
            last_smoothed_altitude: None,
            min_gain_m,
        }
    }

    /// Set the elevation reference without counting any gain.
    pub fn seed_altitude(&mut self, altitude: Option<f64>) {
        self.last_smoothed_altitude = altitude.filter(|a| a.is_finite());
    }

    /// Add a segment to the distance total. Returns whether it counted.
    pub fn add_segment(&mut self, segment_m: f64) -> bool {
        if segment_m.is_finite() && segment_m > 0.0 {
            self.total_distance_m += segment_m;
            true
        } else {
            false
        }
    }

    /// Feed a new smoothed altitude and return the gain it contributed.
    ///
    /// Climbs of at least `min_gain_m` are counted. Any available altitude
    /// becomes the new reference, so descents and jitter below the threshold
    /// move the reference without adding gain.
    pub fn update_elevation(&mut self, altitude: Option<f64>) -> f64 {
        let Some(altitude) = altitude.filter(|a| a.is_finite()) else {
            return 0.0;
        };

        let gained = match self.last_smoothed_altitude {
            Some(reference) if altitude > reference && altitude - reference >= self.min_gain_m => {
                altitude - reference
            }
            _ => 0.0,
        };

        self.total_elevation_gain_m += gained;
        self.last_smoothed_altitude = Some(altitude);
        gained
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn total_elevation_gain_m(&self) -> f64 {
        self.total_elevation_gain_m
    }

    pub fn last_smoothed_altitude(&self) -> Option<f64> {
        self.last_smoothed_altitude
    }

    pub fn reset(&mut self) {
        self.total_distance_m = 0.0;
        self.total_elevation_gain_m = 0.0;
        self.last_smoothed_altitude = None;
    }
}

impl Default for DistanceAccumulator {
    fn default() -> Self {
        Self::new(1.0)
    }
}
