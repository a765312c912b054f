//! SHT40 temperature/humidity sensor, wrapping the `sht4x` driver crate.

use embedded_hal_async::i2c::I2c;
use sht4x::Sht4xAsync;

use super::{EnvSource, SensorError};
use crate::readings::EnvReading;

const SENSOR_NAME: &str = "SHT40";

pub struct Sht40<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

impl<I: I2c> EnvSource for Sht40<I> {
    async fn read_environment(&mut self) -> Result<EnvReading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                log::error!("{SENSOR_NAME} measurement failed: {e:?}");
                SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    details: "i2c communication error or sensor not responding",
                }
            })?;

        Ok(EnvReading {
            temperature_c: measurement.temperature_celsius().to_num::<f32>(),
            relative_humidity: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
