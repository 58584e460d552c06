// src/gps/nmea.rs
//! NMEA sentence parsing and serial-port location source

use super::{
    data::RawSample,
    source::{LocationSource, SubscribeOptions, Subscription, Throttle},
};
use crate::error::{Result, TrackerError};
use chrono::{NaiveDate, NaiveTime, Utc};
use std::{sync::atomic::Ordering, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// User equivalent range error used to turn HDOP into meters
pub const NMEA_UERE_M: f64 = 5.0;

const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;

/// Verify the `*hh` checksum if the sentence carries one.
pub fn checksum_ok(line: &str) -> bool {
    let Some(body) = line.strip_prefix('$') else {
        return false;
    };
    match body.split_once('*') {
        Some((payload, checksum)) => {
            let computed = payload.bytes().fold(0u8, |acc, b| acc ^ b);
            u8::from_str_radix(checksum.trim(), 16).map_or(false, |expected| expected == computed)
        }
        None => true,
    }
}

/// Builds samples out of a stream of NMEA sentences.
///
/// A sample is produced for every GGA sentence with a valid fix. Speed and
/// date come from the latest RMC sentence, since GGA carries neither.
#[derive(Debug, Clone, Default)]
pub struct NmeaFixBuilder {
    speed_mps: Option<f64>,
    date: Option<NaiveDate>,
}

impl NmeaFixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sentence; returns a sample when the sentence completes a fix.
    pub fn feed(&mut self, line: &str) -> Option<RawSample> {
        let line = line.trim();
        if !checksum_ok(line) {
            debug!("Dropping NMEA sentence with bad checksum: {}", line);
            return None;
        }

        let body = line.split('*').next().unwrap_or(line);
        let parts: Vec<&str> = body.split(',').collect();

        if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
            self.parse_gga(&parts)
        } else {
            if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
                self.parse_rmc(&parts);
            }
            None
        }
    }

    /// Parse GGA (Global Positioning System Fix Data) sentence
    fn parse_gga(&self, parts: &[&str]) -> Option<RawSample> {
        if parts.len() < 15 {
            return None;
        }

        // Fix quality (field 6), 0 = no fix
        let quality = parts[6].parse::<u8>().ok()?;
        if quality == 0 {
            return None;
        }

        let latitude = parse_coordinate(parts[2], parts[3], 'S')?;
        let longitude = parse_coordinate(parts[4], parts[5], 'W')?;

        let time = parse_time(parts[1]);
        let timestamp = match (self.date, time) {
            (Some(date), Some(time)) => date.and_time(time).and_utc(),
            (None, Some(time)) => Utc::now().date_naive().and_time(time).and_utc(),
            _ => Utc::now(),
        };

        let mut sample = RawSample::new(latitude, longitude, timestamp);

        // HDOP (field 8)
        sample.accuracy = parts[8].parse::<f64>().ok().map(|hdop| hdop * NMEA_UERE_M);

        // Altitude above mean sea level (field 9)
        sample.altitude = parts[9].parse::<f64>().ok();

        sample.speed = self.speed_mps;

        Some(sample.sanitized())
    }

    /// Parse RMC (Recommended Minimum Course) sentence
    fn parse_rmc(&mut self, parts: &[&str]) {
        if parts.len() < 10 {
            return;
        }

        // Status (field 2): A = valid, V = void
        if parts[2] != "A" {
            self.speed_mps = None;
            return;
        }

        // Speed over ground in knots (field 7)
        self.speed_mps = parts[7].parse::<f64>().ok().map(|knots| knots * KNOTS_TO_MPS);

        // Date ddmmyy (field 9)
        if let Ok(date) = NaiveDate::parse_from_str(parts[9], "%d%m%y") {
            self.date = Some(date);
        }
    }
}

/// Parse `ddmm.mmmm` / `dddmm.mmmm` with hemisphere into signed degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: char) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let coordinate = degrees + minutes / 60.0;
    if hemisphere.starts_with(negative) {
        Some(-coordinate)
    } else {
        Some(coordinate)
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H%M%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H%M%S"))
        .ok()
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| TrackerError::Other(format!("Failed to list serial ports: {}", e)))?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

/// Location source reading NMEA sentences from a serial GPS receiver
#[derive(Debug, Clone)]
pub struct SerialNmeaSource {
    port: String,
    baudrate: u32,
}

impl SerialNmeaSource {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
        }
    }

    fn open(&self) -> Result<BufReader<SerialStream>> {
        info!("Connecting to GPS on {} at {} baud", self.port, self.baudrate);
        let serial = tokio_serial::new(&self.port, self.baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| TrackerError::Connection(format!("Failed to open serial port {}: {}", self.port, e)))?;
        Ok(BufReader::new(serial))
    }
}

impl LocationSource for SerialNmeaSource {
    fn name(&self) -> &str {
        "serial"
    }

    async fn current_fix(&mut self) -> Result<RawSample> {
        let mut reader = self.open()?;
        let mut builder = NmeaFixBuilder::new();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(TrackerError::LocationUnavailable(
                    "serial port closed before a fix was reported".to_string(),
                ));
            }
            if let Some(sample) = builder.feed(&line) {
                return Ok(sample);
            }
        }
    }

    fn subscribe(
        &mut self,
        options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription> {
        let mut reader = self.open()?;

        Ok(Subscription::spawn(move |running| async move {
            let mut builder = NmeaFixBuilder::new();
            let mut throttle = Throttle::new(options);
            let mut line = String::new();

            while running.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        if let Some(sample) = builder.feed(&line) {
                            if throttle.admit(&sample) && tx.send(sample).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Error reading from serial port: {}", e);
                        break;
                    }
                }
            }
            debug!("Serial feed finished");
        }))
    }
}
