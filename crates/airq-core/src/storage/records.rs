//! Fixed-size binary records for the append-only store.
//!
//! Two record kinds, both little-endian with a leading version byte:
//!
//! - `Observation`: 32 bytes — one cycle's concentrations, computed index,
//!   and environment fields. Append-only, no update or delete path.
//! - `BaselineRecord`: 12 bytes — one persisted VOC calibration baseline.
//!
//! The version byte is what makes a schema drift detectable as a typed
//! [`StoreError::SchemaMismatch`] instead of silently misparsed rows.

use super::StoreError;

/// Current layout version for both record kinds.
pub const RECORD_VERSION: u8 = 1;

/// One persisted cycle.
///
/// Binary format (32 bytes, little-endian):
/// - version: 1 byte
/// - reserved: 3 bytes
/// - timestamp: 4 bytes (u32)
/// - pm2_5: 4 bytes (f32, µg/m³)
/// - pm10: 4 bytes (f32, µg/m³)
/// - aqi: 2 bytes (u16)
/// - eco2: 2 bytes (u16, ppm)
/// - tvoc: 2 bytes (u16, ppb)
/// - reserved: 2 bytes
/// - temperature: 4 bytes (i32, milli-°C)
/// - humidity: 4 bytes (i32, milli-%)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Seconds since epoch or boot.
    pub timestamp: u32,
    pub pm2_5_ug_m3: f32,
    pub pm10_ug_m3: f32,
    pub aqi: u16,
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
    /// Milli-degrees Celsius.
    pub temperature_milli_c: i32,
    /// Milli-percent relative humidity.
    pub humidity_milli_percent: i32,
}

impl Observation {
    /// Size of the serialized record in bytes.
    pub const SIZE: usize = 32;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = RECORD_VERSION;
        bytes[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.pm2_5_ug_m3.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.pm10_ug_m3.to_le_bytes());
        bytes[16..18].copy_from_slice(&self.aqi.to_le_bytes());
        bytes[18..20].copy_from_slice(&self.eco2_ppm.to_le_bytes());
        bytes[20..22].copy_from_slice(&self.tvoc_ppb.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.temperature_milli_c.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.humidity_milli_percent.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self, StoreError> {
        check_version(bytes[0])?;
        Ok(Self {
            timestamp: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            pm2_5_ug_m3: f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            pm10_ug_m3: f32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            aqi: u16::from_le_bytes([bytes[16], bytes[17]]),
            eco2_ppm: u16::from_le_bytes([bytes[18], bytes[19]]),
            tvoc_ppb: u16::from_le_bytes([bytes[20], bytes[21]]),
            temperature_milli_c: i32::from_le_bytes([
                bytes[24], bytes[25], bytes[26], bytes[27],
            ]),
            humidity_milli_percent: i32::from_le_bytes([
                bytes[28], bytes[29], bytes[30], bytes[31],
            ]),
        })
    }
}

/// One persisted VOC calibration baseline.
///
/// Binary format (12 bytes, little-endian):
/// - version: 1 byte
/// - reserved: 3 bytes
/// - timestamp: 4 bytes (u32)
/// - eco2 baseline: 2 bytes (u16)
/// - tvoc baseline: 2 bytes (u16)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineRecord {
    pub timestamp: u32,
    pub eco2_baseline: u16,
    pub tvoc_baseline: u16,
}

impl BaselineRecord {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = RECORD_VERSION;
        bytes[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.eco2_baseline.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.tvoc_baseline.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self, StoreError> {
        check_version(bytes[0])?;
        Ok(Self {
            timestamp: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            eco2_baseline: u16::from_le_bytes([bytes[8], bytes[9]]),
            tvoc_baseline: u16::from_le_bytes([bytes[10], bytes[11]]),
        })
    }
}

fn check_version(found: u8) -> Result<(), StoreError> {
    if found == RECORD_VERSION {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch {
            expected: u32::from(RECORD_VERSION),
            actual: u32::from(found),
        })
    }
}
