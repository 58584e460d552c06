// src/gps/mod.rs
//! Location samples and the sources that produce them

pub mod data;
pub mod gpsd;
pub mod nmea;
pub mod replay;
pub mod source;

pub use data::{RawSample, TrackPoint};
pub use source::{LocationSource, SubscribeOptions, Subscription};

use crate::{
    config::{SourceKind, TrackerConfig},
    error::{Result, TrackerError},
};
use gpsd::GpsdSource;
use nmea::SerialNmeaSource;
use replay::ReplaySource;
use std::time::Duration;
use tokio::sync::mpsc;

/// The location source selected by configuration
#[derive(Debug)]
pub enum ConfiguredSource {
    Gpsd(GpsdSource),
    Serial(SerialNmeaSource),
    Replay(ReplaySource),
}

impl ConfiguredSource {
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        match config.source_type {
            SourceKind::Gpsd => Ok(Self::Gpsd(GpsdSource::new(
                config.gpsd_host.clone(),
                config.gpsd_port,
            ))),
            SourceKind::Serial => {
                let port = config.serial_port.clone().ok_or_else(|| {
                    TrackerError::Config("serial source needs serial_port".to_string())
                })?;
                Ok(Self::Serial(SerialNmeaSource::new(port, config.serial_baudrate)))
            }
            SourceKind::Replay => {
                let path = config.replay_file.as_ref().ok_or_else(|| {
                    TrackerError::Config("replay source needs replay_file".to_string())
                })?;
                // Play back at the configured delivery interval
                let pace = Duration::from_millis(config.min_interval_ms);
                Ok(Self::Replay(ReplaySource::load(path)?.with_pace(Some(pace))))
            }
        }
    }
}

impl LocationSource for ConfiguredSource {
    fn name(&self) -> &str {
        match self {
            Self::Gpsd(source) => source.name(),
            Self::Serial(source) => source.name(),
            Self::Replay(source) => source.name(),
        }
    }

    async fn current_fix(&mut self) -> Result<RawSample> {
        match self {
            Self::Gpsd(source) => source.current_fix().await,
            Self::Serial(source) => source.current_fix().await,
            Self::Replay(source) => source.current_fix().await,
        }
    }

    fn subscribe(
        &mut self,
        options: SubscribeOptions,
        tx: mpsc::Sender<RawSample>,
    ) -> Result<Subscription> {
        match self {
            Self::Gpsd(source) => source.subscribe(options, tx),
            Self::Serial(source) => source.subscribe(options, tx),
            Self::Replay(source) => source.subscribe(options, tx),
        }
    }
}
