//! The station's concrete sensor suite, read once per cycle.

use alloc::vec::Vec;
use embedded_hal_async::i2c::I2c;
use log::warn;

use airq_core::acquisition::{AcquireError, SampleBatch, SampleSource};
use airq_core::readings::{Pollutant, PollutantReading};
use airq_core::sensors::EnvSource;
use airq_core::sensors::pmsa003i::Pmsa003i;
use airq_core::sensors::sgp30::Sgp30;
use airq_core::sensors::sht40::Sht40;

/// Single-shot reads of the particulate, VOC and temperature/humidity
/// sensors, all sharing the async I2C bus.
pub struct SensorBank<PI, VI, EI> {
    pm: Pmsa003i<PI>,
    voc: Sgp30<VI>,
    env: Sht40<EI>,
}

impl<PI, VI, EI> SensorBank<PI, VI, EI>
where
    PI: I2c,
    VI: I2c,
    EI: I2c,
{
    pub fn new(pm: Pmsa003i<PI>, voc: Sgp30<VI>, env: Sht40<EI>) -> Self {
        Self { pm, voc, env }
    }
}

impl<PI, VI, EI> SampleSource for SensorBank<PI, VI, EI>
where
    PI: I2c,
    VI: I2c,
    EI: I2c,
{
    async fn acquire(&mut self, now: u32) -> Result<SampleBatch, AcquireError> {
        let pm = self.pm.read().await?;
        let voc = self.voc.measure().await?;

        let mut readings = Vec::with_capacity(4);
        readings.push(PollutantReading::new(
            Pollutant::Pm2_5,
            f32::from(pm.pm2_5_ug_m3),
            now,
        ));
        readings.push(PollutantReading::new(
            Pollutant::Pm10,
            f32::from(pm.pm10_ug_m3),
            now,
        ));
        readings.push(PollutantReading::new(
            Pollutant::Eco2,
            f32::from(voc.eco2_ppm),
            now,
        ));
        readings.push(PollutantReading::new(
            Pollutant::Tvoc,
            f32::from(voc.tvoc_ppb),
            now,
        ));

        // Temperature/humidity is display garnish; its failure should not
        // cost the cycle its pollutant data.
        let env = match self.env.read_environment().await {
            Ok(env) => Some(env),
            Err(e) => {
                warn!("environment read failed: {e}");
                None
            }
        };

        Ok(SampleBatch {
            readings,
            window: (now, now),
            env,
        })
    }
}
