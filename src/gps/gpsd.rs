// src/gps/gpsd.rs
//! GPSD client and location source

use super::{
    data::RawSample,
    source::{LocationSource, SubscribeOptions, Subscription, Throttle},
};
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{collections::HashMap, sync::atomic::Ordering};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse a single line of gpsd JSON data.
///
/// Returns a sample for TPV reports carrying at least a 2D fix, `None` for
/// every other message.
pub fn parse_gpsd_json(line: &str) -> Result<Option<RawSample>> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| TrackerError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    match msg.class.as_str() {
        "TPV" => Ok(parse_tpv_message(&msg.data)),
        "VERSION" => {
            if let Some(version) = msg.data.get("release").and_then(|v| v.as_str()) {
                info!("Connected to gpsd version: {}", version);
            }
            Ok(None)
        }
        "DEVICES" => {
            if let Some(devices) = msg.data.get("devices").and_then(|v| v.as_array()) {
                debug!("gpsd managing {} device(s)", devices.len());
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(msg_data: &HashMap<String, serde_json::Value>) -> Option<RawSample> {
    let number = |key: &str| msg_data.get(key).and_then(|v| v.as_f64());

    // mode 0/1: no fix
    let mode = msg_data.get("mode").and_then(|v| v.as_u64()).unwrap_or(0);
    if mode < 2 {
        return None;
    }

    let latitude = number("lat")?;
    let longitude = number("lon")?;

    let timestamp = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut sample = RawSample::new(latitude, longitude, timestamp);

    // Newer gpsd reports altHAE/altMSL, older ones only alt
    sample.altitude = number("altHAE").or_else(|| number("alt")).or_else(|| number("altMSL"));
    sample.speed = number("speed");
    sample.accuracy = number("eph").or_else(|| match (number("epx"), number("epy")) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    });

    Some(sample.sanitized())
}

/// Location source reading TPV reports from a gpsd daemon
#[derive(Debug, Clone)]
pub struct GpsdSource {
    host: String,
    port: u16,
}

impl GpsdSource {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl LocationSource for GpsdSource {
    fn name(&self) -> &str {
        "gpsd"
    }

    async fn current_fix(&mut self) -> Result<RawSample> {
        let mut reader = connect_gpsd(&self.host, self.port).await?;
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(TrackerError::LocationUnavailable(
                    "gpsd closed the connection before reporting a fix".to_string(),
                ));
            }
            match parse_gpsd_json(line.trim()) {
                Ok(Some(sample)) => return Ok(sample),
                Ok(None) => {}
                Err(e) => debug!("Skipping gpsd line: {}", e),
            }
        }
    }

    fn subscribe(
        &mut self,
        options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription> {
        let host = self.host.clone();
        let port = self.port;

        Ok(Subscription::spawn(move |running| async move {
            let mut reader = match connect_gpsd(&host, port).await {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("gpsd subscription failed: {}", e);
                    return;
                }
            };
            let mut throttle = Throttle::new(options);
            let mut line = String::new();

            while running.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => match parse_gpsd_json(line.trim()) {
                        Ok(Some(sample)) if throttle.admit(&sample) => {
                            if tx.send(sample).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => debug!("Skipping gpsd line: {}", e),
                    },
                    Err(e) => {
                        warn!("Error reading from gpsd: {}", e);
                        break;
                    }
                }
            }
            debug!("gpsd feed finished");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tpv_parsing() {
        let json = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"time":"2023-01-01T12:00:00.000Z","ept":0.005,"lat":48.117,"lon":11.517,"alt":545.4,"epx":15.319,"epy":17.054,"epv":124.484,"track":10.3797,"speed":0.091,"climb":10.7,"eps":34.11,"epc":248.97}"#;

        let sample = parse_gpsd_json(json).unwrap().unwrap();

        assert_eq!(sample.latitude, 48.117);
        assert_eq!(sample.longitude, 11.517);
        assert_eq!(sample.altitude, Some(545.4));
        assert_eq!(sample.speed, Some(0.091)); // stays in m/s
        assert_eq!(sample.accuracy, Some(17.054));
        assert_eq!(sample.timestamp.to_rfc3339(), "2023-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_tpv_prefers_eph_and_alt_hae() {
        let json = r#"{"class":"TPV","mode":3,"lat":46.0,"lon":8.0,"altHAE":1550.2,"altMSL":1502.0,"eph":4.5,"epx":9.0}"#;
        let sample = parse_gpsd_json(json).unwrap().unwrap();
        assert_eq!(sample.altitude, Some(1550.2));
        assert_eq!(sample.accuracy, Some(4.5));
    }

    #[test]
    fn test_tpv_without_fix() {
        let json = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":1}"#;
        assert!(parse_gpsd_json(json).unwrap().is_none());
    }

    #[test]
    fn test_sky_is_not_a_sample() {
        let json = r#"{"class":"SKY","device":"/dev/ttyUSB0","hdop":1.2,"satellites":[{"PRN":1,"ss":42,"used":true}]}"#;
        assert!(parse_gpsd_json(json).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json() {
        let invalid_json = r#"{"invalid": json"#;
        let result = parse_gpsd_json(invalid_json);
        assert!(result.is_err());
    }
}
