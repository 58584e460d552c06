// src/config.rs
//! Configuration management with file storage

use crate::{
    error::{Result, TrackerError},
    export::ExportFormat,
    gps::source::SubscribeOptions,
    tracker::{TimeBase, TrackerSettings},
    tracking::{
        clock::PauseAccounting,
        elevation::ELEVATION_HISTORY_CAPACITY,
        session::SessionSettings,
        validator::ValidatorLimits,
    },
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Gpsd,
    Serial,
    Replay,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Gpsd => f.write_str("gpsd"),
            SourceKind::Serial => f.write_str("serial"),
            SourceKind::Replay => f.write_str("replay"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // Location source
    pub source_type: SourceKind,
    pub gpsd_host: String,
    pub gpsd_port: u16,
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    pub replay_file: Option<PathBuf>,
    pub min_interval_ms: u64,
    pub min_distance_m: f64,
    pub fix_timeout_secs: u64,

    // Sample validation
    pub max_accuracy_m: f64,
    pub max_speed_mps: f64,
    pub fallback_speed_mps: f64,
    pub speed_window_secs: f64,
    pub min_jump_m: f64,

    // Smoothing, path and clock
    pub elevation_window: usize,
    pub min_elevation_gain_m: f64,
    pub min_path_spacing_m: f64,
    pub tick_interval_ms: u64,
    pub pause_accounting: PauseAccounting,

    // Output
    pub output_dir: Option<PathBuf>,
    pub export_format: ExportFormat,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let limits = ValidatorLimits::default();
        Self {
            source_type: SourceKind::Gpsd,
            gpsd_host: "localhost".to_string(),
            gpsd_port: 2947,
            serial_port: None,
            serial_baudrate: 9600,
            replay_file: None,
            min_interval_ms: 1000,
            min_distance_m: 0.0,
            fix_timeout_secs: 10,
            max_accuracy_m: limits.max_accuracy_m,
            max_speed_mps: limits.max_speed_mps,
            fallback_speed_mps: limits.fallback_speed_mps,
            speed_window_secs: limits.speed_window_secs,
            min_jump_m: limits.min_jump_m,
            elevation_window: ELEVATION_HISTORY_CAPACITY,
            min_elevation_gain_m: 1.0,
            min_path_spacing_m: 2.0,
            tick_interval_ms: 100,
            pause_accounting: PauseAccounting::ActiveOnly,
            output_dir: None,
            export_format: ExportFormat::Json,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| TrackerError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TrackerError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TrackerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)
            .map_err(|e| TrackerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| TrackerError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("hike-tracker"))
    }

    /// Where finalized hikes are written
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("hikes")),
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_accuracy_m", self.max_accuracy_m),
            ("max_speed_mps", self.max_speed_mps),
            ("fallback_speed_mps", self.fallback_speed_mps),
            ("speed_window_secs", self.speed_window_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackerError::Config(format!("{} must be positive", name)));
            }
        }

        let non_negative = [
            ("min_distance_m", self.min_distance_m),
            ("min_jump_m", self.min_jump_m),
            ("min_elevation_gain_m", self.min_elevation_gain_m),
            ("min_path_spacing_m", self.min_path_spacing_m),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::Config(format!("{} must not be negative", name)));
            }
        }

        if !(1..=ELEVATION_HISTORY_CAPACITY).contains(&self.elevation_window) {
            return Err(TrackerError::Config(format!(
                "elevation_window must be between 1 and {}",
                ELEVATION_HISTORY_CAPACITY
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(TrackerError::Config("tick_interval_ms must be positive".to_string()));
        }

        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            validator: ValidatorLimits {
                max_accuracy_m: self.max_accuracy_m,
                max_speed_mps: self.max_speed_mps,
                fallback_speed_mps: self.fallback_speed_mps,
                speed_window_secs: self.speed_window_secs,
                min_jump_m: self.min_jump_m,
            },
            elevation_window: self.elevation_window,
            min_elevation_gain_m: self.min_elevation_gain_m,
            min_path_spacing_m: self.min_path_spacing_m,
            pause_accounting: self.pause_accounting,
        }
    }

    pub fn subscribe_options(&self) -> SubscribeOptions {
        SubscribeOptions {
            min_interval: Duration::from_millis(self.min_interval_ms),
            min_distance_m: self.min_distance_m,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            session: self.session_settings(),
            subscribe: self.subscribe_options(),
            fix_timeout: Duration::from_secs(self.fix_timeout_secs),
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            time_base: TimeBase::WallClock,
            ..TrackerSettings::default()
        }
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = SourceKind::Serial;
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = SourceKind::Gpsd;
        self.gpsd_host = host;
        self.gpsd_port = port;
    }

    /// Update replay settings
    pub fn update_replay(&mut self, file: PathBuf) {
        self.source_type = SourceKind::Replay;
        self.replay_file = Some(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("hike-tracker-config-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.source_type, SourceKind::Gpsd);
        assert!(config.validate().is_ok());

        let settings = config.session_settings();
        assert_eq!(settings.validator, ValidatorLimits::default());
        assert_eq!(settings.elevation_window, 5);
        assert_eq!(settings.min_path_spacing_m, 2.0);
        assert_eq!(config.subscribe_options().min_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_update_serial() {
        let mut config = TrackerConfig::default();
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.source_type, SourceKind::Serial);
        assert_eq!(config.serial_port, Some("/dev/ttyUSB0".to_string()));
        assert_eq!(config.serial_baudrate, 115200);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"source_type":"serial","pause_accounting":"wall_clock"}"#).unwrap();
        assert_eq!(config.source_type, SourceKind::Serial);
        assert_eq!(config.pause_accounting, PauseAccounting::WallClock);
        assert_eq!(config.gpsd_port, 2947);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TrackerConfig::default();
        config.elevation_window = 9;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        let mut config = TrackerConfig::default();
        config.min_path_spacing_m = -1.0;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.max_speed_mps = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut config = TrackerConfig::default();
        config.update_gpsd("gps.local".to_string(), 3000);
        config.export_format = ExportFormat::Gpx;
        config.save_to(&path).unwrap();

        let loaded = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let loaded = TrackerConfig::load_from(&temp_path("missing")).unwrap();
        assert_eq!(loaded, TrackerConfig::default());
    }
}
