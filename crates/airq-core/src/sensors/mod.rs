//! Sensor adapter traits and I2C drivers.
//!
//! The traits are what the acquisition loop sees; the driver modules are
//! concrete implementations for the hardware the station carries. Driver
//! crates pulled from the ecosystem sit behind feature flags so desktop
//! builds stay lean.

pub mod pmsa003i;
pub mod sgp30;
#[cfg(feature = "sensor-sht40")]
pub mod sht40;

use thiserror_no_std::Error;

use crate::readings::{CalibrationBaseline, EnvReading, VocReading};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transfer failed. Transient: retry on the next cycle.
    #[error("{sensor}: read failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        details: &'static str,
    },
    /// The device answered, but with a frame that fails validation.
    #[error("{sensor}: malformed response: {details}")]
    BadResponse {
        sensor: &'static str,
        details: &'static str,
    },
}

/// A VOC sensor that exposes its IAQ calibration baseline.
pub trait BaselineSensor {
    /// Read the live eCO₂/TVOC measurement.
    fn read_air_quality(&mut self) -> impl Future<Output = Result<VocReading, SensorError>>;

    /// Read the sensor's current calibration baseline.
    fn read_baseline(
        &mut self,
    ) -> impl Future<Output = Result<CalibrationBaseline, SensorError>>;

    /// Seed the sensor with a previously persisted baseline.
    fn restore_baseline(
        &mut self,
        baseline: CalibrationBaseline,
    ) -> impl Future<Output = Result<(), SensorError>>;
}

/// A source of temperature/humidity readings fetched alongside the
/// pollutant measurements.
pub trait EnvSource {
    fn read_environment(&mut self) -> impl Future<Output = Result<EnvReading, SensorError>>;
}
