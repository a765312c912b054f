//! PMSA003I particulate matter sensor driver.
//!
//! The sensor exposes a 32-byte register block over I2C: a fixed two-byte
//! header, twelve big-endian data words, and a trailing checksum over the
//! first 30 bytes. Only the CF=1 standard-particle PM2.5/PM10 words are
//! used here; the environmental-unit and particle-count words are parsed
//! past for completeness of the frame check only.

use embedded_hal_async::i2c::I2c;
use log::warn;

use super::SensorError;

pub const PMSA003I_ADDR: u8 = 0x12;

const SENSOR_NAME: &str = "PMSA003I";
const EXPECTED_HEADER: [u8; 2] = [0x42, 0x4D];
const FRAME_LEN: usize = 32;

/// The two concentration words the station cares about, in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticulateReading {
    pub pm2_5_ug_m3: u16,
    pub pm10_ug_m3: u16,
}

pub struct Pmsa003i<I> {
    i2c: I,
}

impl<I: I2c> Pmsa003i<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Fetch and validate one measurement frame.
    pub async fn read(&mut self) -> Result<ParticulateReading, SensorError> {
        let mut frame = [0u8; FRAME_LEN];
        self.i2c
            .write_read(PMSA003I_ADDR, &[0x00], &mut frame)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                details: "i2c transfer failed",
            })?;

        validate_header(&frame)?;
        validate_checksum(&frame)?;

        Ok(ParticulateReading {
            pm2_5_ug_m3: u16::from_be_bytes([frame[6], frame[7]]),
            pm10_ug_m3: u16::from_be_bytes([frame[8], frame[9]]),
        })
    }
}

/// The first two registers hold hardcoded magic values; anything else means
/// the frame is garbage or the bus glitched mid-transfer.
fn validate_header(frame: &[u8]) -> Result<(), SensorError> {
    if frame[0..2] == EXPECTED_HEADER {
        Ok(())
    } else {
        warn!(
            "{SENSOR_NAME}: bad header 0x{:02X}{:02X}, expected 0x{:02X}{:02X}",
            frame[0], frame[1], EXPECTED_HEADER[0], EXPECTED_HEADER[1]
        );
        Err(SensorError::BadResponse {
            sensor: SENSOR_NAME,
            details: "header mismatch",
        })
    }
}

/// The last two bytes carry the sum of the first 30, big-endian.
fn validate_checksum(frame: &[u8]) -> Result<(), SensorError> {
    let mut calculated: u16 = 0;
    for &byte in frame.iter().take(FRAME_LEN - 2) {
        calculated = calculated.wrapping_add(u16::from(byte));
    }
    let received = u16::from_be_bytes([frame[30], frame[31]]);

    if calculated == received {
        Ok(())
    } else {
        Err(SensorError::BadResponse {
            sensor: SENSOR_NAME,
            details: "checksum mismatch",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(pm2_5: u16, pm10: u16) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0..2].copy_from_slice(&EXPECTED_HEADER);
        frame[6..8].copy_from_slice(&pm2_5.to_be_bytes());
        frame[8..10].copy_from_slice(&pm10.to_be_bytes());
        let sum: u16 = frame[..30].iter().map(|&b| u16::from(b)).sum();
        frame[30..32].copy_from_slice(&sum.to_be_bytes());
        frame
    }

    #[test]
    fn test_valid_frame_passes_validation() {
        let frame = frame_with(12, 54);
        assert_eq!(validate_header(&frame), Ok(()));
        assert_eq!(validate_checksum(&frame), Ok(()));
        assert_eq!(u16::from_be_bytes([frame[6], frame[7]]), 12);
        assert_eq!(u16::from_be_bytes([frame[8], frame[9]]), 54);
    }

    #[test]
    fn test_bad_header_is_rejected() {
        let mut frame = frame_with(12, 54);
        frame[0] = 0x00;
        assert_eq!(
            validate_header(&frame),
            Err(SensorError::BadResponse {
                sensor: SENSOR_NAME,
                details: "header mismatch",
            })
        );
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let mut frame = frame_with(12, 54);
        frame[7] ^= 0xFF;
        assert_eq!(
            validate_checksum(&frame),
            Err(SensorError::BadResponse {
                sensor: SENSOR_NAME,
                details: "checksum mismatch",
            })
        );
    }
}
