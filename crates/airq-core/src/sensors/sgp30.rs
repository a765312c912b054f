//! SGP30 VOC/eCO₂ sensor driver.
//!
//! The SGP30 speaks a command-word protocol: write a two-byte command,
//! wait the command's processing time, then read back data words, each a
//! big-endian u16 followed by a CRC-8. The IAQ engine must be initialized
//! once after power-up and takes tens of seconds to move off its sentinel
//! output; see [`crate::calibration`] for the wait policy.

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;
use log::warn;

use super::{BaselineSensor, SensorError};
use crate::readings::{CalibrationBaseline, VocReading};

pub const SGP30_ADDR: u8 = 0x58;

/// Factory IAQ baseline from the vendor application note. Restored at
/// startup when the store holds no persisted baseline row.
pub const DEFAULT_BASELINE: CalibrationBaseline = CalibrationBaseline {
    eco2: 0x8973,
    tvoc: 0x8AAE,
};

const SENSOR_NAME: &str = "SGP30";

const CMD_IAQ_INIT: [u8; 2] = [0x20, 0x03];
const CMD_MEASURE_IAQ: [u8; 2] = [0x20, 0x08];
const CMD_GET_IAQ_BASELINE: [u8; 2] = [0x20, 0x15];
const CMD_SET_IAQ_BASELINE: [u8; 2] = [0x20, 0x1E];

/// Max command processing time per the datasheet; measure_iaq is the
/// slowest at 12 ms.
const MEASURE_DELAY: Duration = Duration::from_millis(12);
const COMMAND_DELAY: Duration = Duration::from_millis(10);

pub struct Sgp30<I> {
    i2c: I,
}

impl<I: I2c> Sgp30<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Start the IAQ engine. Must be called once after power-up, before
    /// any measurement or baseline command.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        self.command(&CMD_IAQ_INIT).await?;
        Timer::after(COMMAND_DELAY).await;
        Ok(())
    }

    /// Read one eCO₂/TVOC measurement.
    pub async fn measure(&mut self) -> Result<VocReading, SensorError> {
        let words = self.command_read::<2>(&CMD_MEASURE_IAQ, MEASURE_DELAY).await?;
        Ok(VocReading {
            eco2_ppm: words[0],
            tvoc_ppb: words[1],
        })
    }

    /// Read the IAQ engine's current calibration baseline.
    pub async fn baseline(&mut self) -> Result<CalibrationBaseline, SensorError> {
        let words = self
            .command_read::<2>(&CMD_GET_IAQ_BASELINE, COMMAND_DELAY)
            .await?;
        Ok(CalibrationBaseline {
            eco2: words[0],
            tvoc: words[1],
        })
    }

    /// Seed the IAQ engine with a previously persisted baseline.
    ///
    /// The set command expects the words in TVOC-then-eCO₂ order, the
    /// reverse of what the get command returns.
    pub async fn set_baseline(&mut self, baseline: CalibrationBaseline) -> Result<(), SensorError> {
        let mut buffer = [0u8; 8];
        buffer[0..2].copy_from_slice(&CMD_SET_IAQ_BASELINE);
        write_word(&mut buffer[2..5], baseline.tvoc);
        write_word(&mut buffer[5..8], baseline.eco2);

        self.i2c
            .write(SGP30_ADDR, &buffer)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                details: "i2c write failed",
            })?;
        Timer::after(COMMAND_DELAY).await;
        Ok(())
    }

    async fn command(&mut self, command: &[u8; 2]) -> Result<(), SensorError> {
        self.i2c
            .write(SGP30_ADDR, command)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                details: "i2c write failed",
            })
    }

    /// Issue a command, wait its processing time, then read `N` data words
    /// and verify each word's CRC.
    async fn command_read<const N: usize>(
        &mut self,
        command: &[u8; 2],
        delay: Duration,
    ) -> Result<[u16; N], SensorError> {
        self.command(command).await?;
        Timer::after(delay).await;

        let mut raw = [0u8; 6];
        debug_assert!(N * 3 <= raw.len());
        self.i2c
            .read(SGP30_ADDR, &mut raw[..N * 3])
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                details: "i2c read failed",
            })?;

        let mut words = [0u16; N];
        for (i, word) in words.iter_mut().enumerate() {
            let chunk = &raw[i * 3..i * 3 + 3];
            if crc8(&chunk[0..2]) != chunk[2] {
                warn!("{SENSOR_NAME}: crc mismatch on word {i}");
                return Err(SensorError::BadResponse {
                    sensor: SENSOR_NAME,
                    details: "crc mismatch",
                });
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(words)
    }
}

fn write_word(out: &mut [u8], word: u16) {
    let bytes = word.to_be_bytes();
    out[0] = bytes[0];
    out[1] = bytes[1];
    out[2] = crc8(&bytes);
}

/// CRC-8 with polynomial 0x31 and initial value 0xFF, as the datasheet
/// specifies for every data word on the bus.
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x31;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

impl<I: I2c> BaselineSensor for Sgp30<I> {
    async fn read_air_quality(&mut self) -> Result<VocReading, SensorError> {
        self.measure().await
    }

    async fn read_baseline(&mut self) -> Result<CalibrationBaseline, SensorError> {
        self.baseline().await
    }

    async fn restore_baseline(
        &mut self,
        baseline: CalibrationBaseline,
    ) -> Result<(), SensorError> {
        self.set_baseline(baseline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_datasheet_vector() {
        // The datasheet gives CRC(0xBEEF) = 0x92.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_write_word_appends_crc() {
        let mut out = [0u8; 3];
        write_word(&mut out, 0xBEEF);
        assert_eq!(out, [0xBE, 0xEF, 0x92]);
    }
}
