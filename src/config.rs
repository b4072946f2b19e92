//! Instrument configuration: sensor ranges, output wiring, duration tables.
//!
//! Everything here is serializable so a rig can be described in a JSON file
//! and loaded with `--config`. Absent fields fall back to the defaults of the
//! reference build (MPU-6050 at ±8 g / ±500 °/s / 5 Hz, buzzers on GPIO 25
//! and 26, four NeoPixel strips).

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::scale::DurationTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] io::Error),
    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duration table of {len} entries leaves the {bucket} bucket empty")]
    EmptyBucket { len: usize, bucket: &'static str },
}

/// Accelerometer full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelRange {
    G2,
    G4,
    G8,
    G16,
}

/// Gyroscope full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GyroRange {
    Deg250,
    Deg500,
    Deg1000,
    Deg2000,
}

/// Digital low-pass filter bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterBandwidth {
    Hz260,
    Hz184,
    Hz94,
    Hz44,
    Hz21,
    Hz10,
    Hz5,
}

/// Passed through to the sensor at init. The engine never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
    pub filter_bandwidth: FilterBandwidth,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            accel_range: AccelRange::G8,
            gyro_range: GyroRange::Deg500,
            filter_bandwidth: FilterBandwidth::Hz5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripConfig {
    pub pin: u8,
    pub len: usize,
}

/// How many times to try bringing the sensor up before halting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// First back-off; doubles after every failed attempt.
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub sensor: SensorConfig,
    /// Tone pins for [melody, bass]
    pub tone_pins: [u8; 2],
    pub led_strips: Vec<StripConfig>,
    /// Duration table used in duet mode (ms)
    pub durations: Vec<u32>,
    /// Duration table used in solo mode (ms)
    pub solo_durations: Vec<u32>,
    pub retry: RetryPolicy,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            tone_pins: [25, 26],
            led_strips: vec![
                StripConfig { pin: 33, len: 19 },
                StripConfig { pin: 32, len: 19 },
                StripConfig { pin: 27, len: 22 },
                StripConfig { pin: 23, len: 22 },
            ],
            durations: DurationTable::standard().values().to_vec(),
            solo_durations: DurationTable::compact().values().to_vec(),
            retry: RetryPolicy::default(),
        }
    }
}

impl InstrumentConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&data)?;
        // Reject unusable tables up front rather than mid-performance.
        cfg.duration_table()?;
        cfg.solo_duration_table()?;
        info!("Loaded instrument config from {:?}", path);
        Ok(cfg)
    }

    /// Load if a path was given, otherwise defaults. A bad file is reported
    /// and replaced by defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load(p).unwrap_or_else(|e| {
                warn!("Ignoring config {:?}: {}", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Instrument config saved to {:?}", path);
        Ok(())
    }

    pub fn duration_table(&self) -> Result<DurationTable, ConfigError> {
        DurationTable::new(self.durations.clone())
    }

    pub fn solo_duration_table(&self) -> Result<DurationTable, ConfigError> {
        DurationTable::new(self.solo_durations.clone())
    }

    pub fn strip_lengths(&self) -> Vec<usize> {
        self.led_strips.iter().map(|s| s.len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_rig() {
        let cfg = InstrumentConfig::default();
        assert_eq!(cfg.sensor.accel_range, AccelRange::G8);
        assert_eq!(cfg.sensor.gyro_range, GyroRange::Deg500);
        assert_eq!(cfg.sensor.filter_bandwidth, FilterBandwidth::Hz5);
        assert_eq!(cfg.tone_pins, [25, 26]);
        assert_eq!(cfg.strip_lengths(), vec![19, 19, 22, 22]);
        assert_eq!(cfg.durations.len(), 20);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.json");
        std::fs::write(&path, r#"{ "tone_pins": [4, 5] }"#).unwrap();
        let cfg = InstrumentConfig::load(&path).unwrap();
        assert_eq!(cfg.tone_pins, [4, 5]);
        assert_eq!(cfg.sensor, SensorConfig::default());
        assert_eq!(cfg.led_strips.len(), 4);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.json");
        let mut cfg = InstrumentConfig::default();
        cfg.retry.max_attempts = 7;
        cfg.save(&path).unwrap();
        assert_eq!(InstrumentConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_unusable_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.json");
        std::fs::write(&path, r#"{ "durations": [125] }"#).unwrap();
        let err = InstrumentConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBucket { len: 1, .. }), "{err}");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let cfg = InstrumentConfig::load_or_default(Some(Path::new("/nonexistent/rig.json")));
        assert_eq!(cfg, InstrumentConfig::default());
    }
}
