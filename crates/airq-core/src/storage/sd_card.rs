//! SD card backend for the observation store.
//!
//! Rows are fixed-size binary records appended to flat files in the card's
//! root directory. The volume is opened fresh for every operation and
//! closed before returning, so a failed cycle never leaves a handle open
//! across the sleep.
//!
//! These SD card operations are blocking. The acquisition loop is the only
//! task touching the card and tolerates the stall, so no async shim is
//! layered over `embedded_sdmmc` here.

use alloc::vec::Vec;

use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};
use log::{error, warn};

use super::records::{BaselineRecord, Observation};
use super::{ReadingStore, StoreError};
use crate::config::MonitorConfig;

pub const OBSERVATION_FILE: &str = "aqdata.bin";
pub const BASELINE_FILE: &str = "baseline.bin";
pub const CONFIG_FILE: &str = "config.bin";

/// Largest serialized [`MonitorConfig`] the loader will accept.
const CONFIG_MAX_LEN: usize = 128;

pub struct SdStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }

    /// Load the monitor configuration blob, if one has been provisioned on
    /// the card. Any read or decode problem falls back to `None` so a bad
    /// blob cannot keep the station from booting.
    pub fn load_config(&self) -> Option<MonitorConfig> {
        let mut buffer = [0u8; CONFIG_MAX_LEN];
        let len = match self.read_file(CONFIG_FILE, &mut buffer) {
            Ok(len) => len,
            Err(e) => {
                warn!("config blob not readable ({e:?}); using defaults");
                return None;
            }
        };
        if len == 0 {
            return None;
        }
        match postcard::from_bytes(&buffer[..len]) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("config blob not decodable ({e:?}); using defaults");
                None
            }
        }
    }

    /// Append raw record bytes to a file, creating it on first write.
    fn append_record(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), embedded_sdmmc::Error<SdCardError>> {
        let volume = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadWriteCreateOrAppend)?;

        file.write(bytes)?;

        file.close()?;
        root_dir.close()?;
        volume.close()?;
        Ok(())
    }

    /// Read up to `buffer.len()` bytes from the start of a file, returning
    /// the byte count. The file is created empty if it does not exist yet,
    /// so a first boot sees an empty store rather than an error.
    fn read_file(
        &self,
        file_name: &str,
        buffer: &mut [u8],
    ) -> Result<usize, embedded_sdmmc::Error<SdCardError>> {
        let volume = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadWriteCreateOrAppend)?;
        file.seek_from_start(0)?;

        let mut total = 0;
        while total < buffer.len() {
            let read = file.read(&mut buffer[total..])?;
            if read == 0 {
                break;
            }
            total += read;
        }

        file.close()?;
        root_dir.close()?;
        volume.close()?;
        Ok(total)
    }

    /// Read every whole `SIZE`-byte chunk from a record file, along with
    /// the length of any trailing partial record.
    fn read_record_chunks<const SIZE: usize>(
        &self,
        file_name: &str,
    ) -> Result<(Vec<[u8; SIZE]>, u32), embedded_sdmmc::Error<SdCardError>> {
        let volume = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadWriteCreateOrAppend)?;
        file.seek_from_start(0)?;

        let length = file.length() as usize;
        let remainder = (length % SIZE) as u32;

        let mut chunks = Vec::with_capacity(length / SIZE);
        if remainder == 0 {
            let mut record = [0u8; SIZE];
            'records: loop {
                let mut filled = 0;
                while filled < SIZE {
                    let read = file.read(&mut record[filled..])?;
                    if read == 0 {
                        break 'records;
                    }
                    filled += read;
                }
                chunks.push(record);
            }
        }

        file.close()?;
        root_dir.close()?;
        volume.close()?;
        Ok((chunks, remainder))
    }

    /// Load a record file, surfacing a trailing partial record as a typed
    /// schema mismatch instead of a silent misparse.
    fn load_records<const SIZE: usize>(
        &self,
        file_name: &str,
    ) -> Result<Vec<[u8; SIZE]>, StoreError> {
        let (chunks, remainder) = self.read_record_chunks(file_name).map_err(|e| {
            error!("sd card read of {file_name} failed: {e:?}");
            StoreError::Connection {
                details: "sd card read failed",
            }
        })?;
        if remainder != 0 {
            return Err(StoreError::SchemaMismatch {
                expected: SIZE as u32,
                actual: remainder,
            });
        }
        Ok(chunks)
    }
}

impl<S, D, T> ReadingStore for SdStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    async fn append_observation(&mut self, row: &Observation) -> Result<(), StoreError> {
        self.append_record(OBSERVATION_FILE, &row.to_bytes())
            .map_err(|e| {
                error!("sd card append of observation failed: {e:?}");
                StoreError::Connection {
                    details: "sd card write failed",
                }
            })
    }

    async fn observations_within(
        &mut self,
        window: (u32, u32),
    ) -> Result<Vec<Observation>, StoreError> {
        let chunks = self.load_records::<{ Observation::SIZE }>(OBSERVATION_FILE)?;
        let mut rows = Vec::new();
        for chunk in &chunks {
            let row = Observation::from_bytes(chunk)?;
            if row.timestamp >= window.0 && row.timestamp <= window.1 {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn append_baseline(&mut self, row: &BaselineRecord) -> Result<(), StoreError> {
        self.append_record(BASELINE_FILE, &row.to_bytes())
            .map_err(|e| {
                error!("sd card append of baseline failed: {e:?}");
                StoreError::Connection {
                    details: "sd card write failed",
                }
            })
    }

    async fn latest_baseline(&mut self) -> Result<Option<BaselineRecord>, StoreError> {
        let chunks = self.load_records::<{ BaselineRecord::SIZE }>(BASELINE_FILE)?;
        match chunks.last() {
            Some(chunk) => Ok(Some(BaselineRecord::from_bytes(chunk)?)),
            None => Ok(None),
        }
    }
}
