//! Shared data model for pollutant observations.
//!
//! Everything in this module is a plain value type: produced by a sensor
//! adapter or a store query, consumed by the aggregator and calculator,
//! and discarded at the end of the cycle.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// A pollutant kind the station can observe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pollutant {
    /// Fine particulate matter, µg/m³
    Pm2_5,
    /// Coarse particulate matter, µg/m³
    Pm10,
    /// Equivalent CO₂, ppm
    Eco2,
    /// Total volatile organic compounds, ppb
    Tvoc,
}

impl Pollutant {
    /// Short label used in log lines and display text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pm2_5 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::Eco2 => "eCO2",
            Self::Tvoc => "TVOC",
        }
    }

    /// Measurement unit for this pollutant's concentration values.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Pm2_5 | Self::Pm10 => "ug/m3",
            Self::Eco2 => "ppm",
            Self::Tvoc => "ppb",
        }
    }
}

impl core::fmt::Display for Pollutant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One observation of one pollutant at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollutantReading {
    pub pollutant: Pollutant,
    /// Concentration in the pollutant's unit. Never negative for readings
    /// produced by the adapters in this crate.
    pub concentration: f32,
    /// Seconds since epoch or boot, depending on the deployment's clock.
    pub timestamp: u32,
}

impl PollutantReading {
    pub const fn new(pollutant: Pollutant, concentration: f32, timestamp: u32) -> Self {
        Self {
            pollutant,
            concentration,
            timestamp,
        }
    }
}

/// Mean concentration of one pollutant over a time window.
///
/// Only produced by [`crate::aggregate::aggregate`], which guarantees the
/// window contained at least one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedSample {
    pub pollutant: Pollutant,
    pub mean: f32,
    pub window_start: u32,
    pub window_end: u32,
}

/// Result of an overall index computation.
///
/// Computed fresh each cycle and immediately consumed by persistence and
/// rendering; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiResult {
    /// The overall index: maximum of the per-pollutant sub-indices.
    pub index: u16,
    /// The pollutant whose sub-index equals the overall index. When several
    /// tie, the earliest in input order wins.
    pub dominant: Pollutant,
    /// Every sub-index that went into the maximum, in input order.
    pub sub_indices: Vec<(Pollutant, u16)>,
}

/// IAQ calibration baseline for the VOC sensor.
///
/// Persisted so a restarted process can resume without re-calibrating from
/// scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationBaseline {
    pub eco2: u16,
    pub tvoc: u16,
}

/// Live eCO₂/TVOC values from the VOC sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocReading {
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
}

/// Temperature and humidity fetched alongside the pollutant readings for
/// display and the persisted observation row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f32,
    pub relative_humidity: f32,
}
