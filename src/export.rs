// src/export.rs
//! Rendering finalized hikes into track file formats

use crate::{
    error::{Result, TrackerError},
    tracking::result::FinalizedHike,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Gpx,
    #[value(name = "geojson")]
    GeoJson,
    Kml,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Gpx => "gpx",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Kml => "kml",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Gpx => "GPX (GPS Exchange)",
            ExportFormat::GeoJson => "GeoJSON",
            ExportFormat::Kml => "KML (Keyhole)",
            ExportFormat::Csv => "CSV",
        }
    }
}

/// Render a hike in the requested format.
///
/// JSON is the full record (metadata, start time and the camelCase result);
/// the other formats carry the path as a single track.
pub fn render(hike: &FinalizedHike, format: ExportFormat) -> Result<String> {
    if hike.result.path.is_empty() {
        return Err(TrackerError::Other("Hike has no track points to export".to_string()));
    }

    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(hike)?),
        ExportFormat::Gpx => Ok(to_gpx(hike)),
        ExportFormat::GeoJson => to_geojson(hike),
        ExportFormat::Kml => Ok(to_kml(hike)),
        ExportFormat::Csv => Ok(to_csv(hike)),
    }
}

fn track_name(hike: &FinalizedHike) -> String {
    hike.meta
        .trail_name
        .clone()
        .unwrap_or_else(|| format!("Hike {}", hike.started_at.format("%Y-%m-%d %H:%M")))
}

fn to_gpx(hike: &FinalizedHike) -> String {
    let mut gpx = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Hike Tracker" xmlns="http://www.topografix.com/GPX/1/1">
"#);

    gpx.push_str(&format!(
        "  <metadata>\n    <time>{}</time>\n  </metadata>\n",
        hike.started_at.to_rfc3339()
    ));
    gpx.push_str("  <trk>\n");
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(&track_name(hike))));
    gpx.push_str(&format!(
        "    <desc>{:.1} m, {:.1} m gain, {}</desc>\n",
        hike.result.distance_meters,
        hike.result.elevation_gain_meters,
        hike.format_duration()
    ));
    gpx.push_str("    <trkseg>\n");

    for point in &hike.result.path {
        gpx.push_str(&format!(
            "      <trkpt lat=\"{}\" lon=\"{}\">\n",
            point.latitude, point.longitude
        ));
        if let Some(ele) = point.altitude {
            gpx.push_str(&format!("        <ele>{}</ele>\n", ele));
        }
        gpx.push_str(&format!("        <time>{}</time>\n", point.timestamp.to_rfc3339()));
        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    gpx
}

fn to_geojson(hike: &FinalizedHike) -> Result<String> {
    let coordinates: Vec<serde_json::Value> = hike
        .result
        .path
        .iter()
        .map(|point| match point.altitude {
            Some(ele) => serde_json::json!([point.longitude, point.latitude, ele]),
            None => serde_json::json!([point.longitude, point.latitude]),
        })
        .collect();

    let times: Vec<String> = hike
        .result
        .path
        .iter()
        .map(|point| point.timestamp.to_rfc3339())
        .collect();

    let feature = serde_json::json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates
        },
        "properties": {
            "name": track_name(hike),
            "userId": hike.meta.user_id,
            "trailId": hike.meta.trail_id,
            "startedAt": hike.started_at.to_rfc3339(),
            "distanceMeters": hike.result.distance_meters,
            "elevationGainMeters": hike.result.elevation_gain_meters,
            "elapsedSeconds": hike.result.elapsed_seconds,
            "coordTimes": times
        }
    });

    let feature_collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": [feature]
    });

    Ok(serde_json::to_string_pretty(&feature_collection)?)
}

fn to_kml(hike: &FinalizedHike) -> String {
    let mut kml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
"#);

    let name = escape_xml(&track_name(hike));
    kml.push_str(&format!("    <name>{}</name>\n", name));
    kml.push_str("    <Placemark>\n");
    kml.push_str(&format!("      <name>{}</name>\n", name));
    kml.push_str(&format!(
        "      <TimeStamp><when>{}</when></TimeStamp>\n",
        hike.started_at.to_rfc3339()
    ));
    kml.push_str("      <LineString>\n        <coordinates>\n");

    for point in &hike.result.path {
        kml.push_str(&format!(
            "          {},{},{}\n",
            point.longitude,
            point.latitude,
            point.altitude.unwrap_or(0.0)
        ));
    }

    kml.push_str("        </coordinates>\n      </LineString>\n");
    kml.push_str("    </Placemark>\n  </Document>\n</kml>\n");
    kml
}

fn to_csv(hike: &FinalizedHike) -> String {
    let mut csv = String::from("user_id,trail_id,latitude,longitude,elevation,timestamp\n");
    let user = escape_csv(&hike.meta.user_id);
    let trail = hike.meta.trail_id.as_deref().map_or(String::new(), escape_csv);

    for point in &hike.result.path {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            user,
            trail,
            point.latitude,
            point.longitude,
            point.altitude.map_or(String::new(), |e| e.to_string()),
            point.timestamp.to_rfc3339()
        ));
    }

    csv
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gps::data::TrackPoint,
        tracking::result::{SessionMeta, TrackingResult},
    };
    use chrono::{TimeZone, Utc};

    fn hike() -> FinalizedHike {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let point = |lat: f64, alt: Option<f64>, secs: i64| TrackPoint {
            latitude: lat,
            longitude: 8.0,
            altitude: alt,
            timestamp: t0 + chrono::Duration::seconds(secs),
        };
        FinalizedHike {
            meta: SessionMeta::new("alice")
                .with_trail_id("t-42")
                .with_trail_name("Ridge & Lake"),
            started_at: t0,
            result: TrackingResult {
                distance_meters: 22.2,
                elevation_gain_meters: 3.0,
                elapsed_seconds: 20.0,
                path: vec![
                    point(46.0, Some(1500.0), 0),
                    point(46.0001, Some(1503.0), 10),
                    point(46.0002, None, 20),
                ],
            },
        }
    }

    #[test]
    fn test_json_export_is_full_record() {
        let json = render(&hike(), ExportFormat::Json).unwrap();
        let parsed: FinalizedHike = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hike());
        assert!(json.contains("\"distanceMeters\""));
    }

    #[test]
    fn test_gpx_export() {
        let gpx = render(&hike(), ExportFormat::Gpx).unwrap();
        assert!(gpx.contains("<trkseg>"));
        assert!(gpx.contains("Ridge &amp; Lake"));
        assert_eq!(gpx.matches("<trkpt").count(), 3);
        assert_eq!(gpx.matches("<ele>").count(), 2);
    }

    #[test]
    fn test_geojson_export() {
        let text = render(&hike(), ExportFormat::GeoJson).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(feature["geometry"]["coordinates"][0][2], 1500.0);
        assert_eq!(feature["geometry"]["coordinates"][2].as_array().map(|c| c.len()), Some(2));
        assert_eq!(feature["properties"]["userId"], "alice");
    }

    #[test]
    fn test_kml_and_csv_export() {
        let kml = render(&hike(), ExportFormat::Kml).unwrap();
        assert!(kml.contains("<LineString>"));
        assert!(kml.contains("8,46.0002,0"));

        let csv = render(&hike(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("alice,t-42,46,8,1500,"));
        assert!(lines[3].contains(",,2024-06-01T08:00:20+00:00"));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let mut empty = hike();
        empty.result.path.clear();
        assert!(render(&empty, ExportFormat::Gpx).is_err());
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_xml("a<b>\"c\""), "a&lt;b&gt;&quot;c&quot;");
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,\"b\""), "\"a,\"\"b\"\"\"");
    }
}
