//! Runtime configuration for the monitoring loop.
//!
//! Deployments load a serialized [`MonitorConfig`] from their store at boot
//! (see [`crate::storage::sd_card`]) and fall back to the defaults below,
//! which match the constants the station has always run with.

use serde::{Deserialize, Serialize};

use crate::aqi::Standard;
use crate::readings::Pollutant;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Index computation standard for the breakpoint tables.
    pub standard: Standard,
    /// Pollutants that feed the overall index. Validated against the
    /// standard's tables before the loop starts.
    pub index_pollutants: [Pollutant; 2],
    /// Trailing window for store-sourced aggregation, seconds.
    pub sample_window_secs: u32,
    /// Sleep between cycles, seconds.
    pub cycle_interval_secs: u32,
    /// Short sleep before retrying after an acquire failure, seconds.
    pub retry_backoff_secs: u32,
    /// Whether computed cycles are appended to the store. Off for
    /// display-only deployments that source their readings from the same
    /// store they would otherwise write back into.
    pub record_observations: bool,
    pub calibration: CalibrationConfig,
    pub display: DisplayGeometry,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// Give up waiting for the VOC sensor after this many polls.
    pub max_attempts: u32,
    /// Seconds between calibration polls.
    pub poll_interval_secs: u32,
    /// Persist the in-progress baseline every this many seconds of waiting.
    pub baseline_persist_secs: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u16,
    pub height: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            standard: Standard::Epa,
            index_pollutants: [Pollutant::Pm2_5, Pollutant::Pm10],
            sample_window_secs: 3600,
            cycle_interval_secs: 150,
            retry_backoff_secs: 10,
            record_observations: true,
            calibration: CalibrationConfig::default(),
            display: DisplayGeometry::default(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 90,
            poll_interval_secs: 1,
            baseline_persist_secs: 20,
        }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        // 128x32 OLED panel.
        Self {
            width: 128,
            height: 32,
        }
    }
}
