//! Append-only observation store.
//!
//! The acquisition loop sees only the [`ReadingStore`] trait; the concrete
//! backend is an SD card with fixed-size binary records (see
//! [`sd_card`] and [`records`]). Connection parameters live with the
//! backend, never in the loop.

pub mod records;
pub mod sd_card;

pub use records::{BaselineRecord, Observation};

use alloc::vec::Vec;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The storage medium could not be reached or the operation failed
    /// partway. Transient: the loop retries next cycle with a freshly
    /// opened volume.
    #[error("store unavailable: {details}")]
    Connection { details: &'static str },
    /// Stored data does not have the shape this build expects. Non-fatal,
    /// but explicit: the offending rows are skipped, not misparsed.
    #[error("stored row shape mismatch: expected {expected}, found {actual}")]
    SchemaMismatch { expected: u32, actual: u32 },
}

/// The persistence contract the acquisition loop depends on.
///
/// Append-only; there is no update or delete path. Row ordering across
/// concurrent writers is undefined and acceptable.
pub trait ReadingStore {
    /// Append one cycle's observation row.
    fn append_observation(
        &mut self,
        row: &Observation,
    ) -> impl Future<Output = Result<(), StoreError>>;

    /// Fetch every observation whose timestamp falls within
    /// `[window.0, window.1]`, in stored order.
    fn observations_within(
        &mut self,
        window: (u32, u32),
    ) -> impl Future<Output = Result<Vec<Observation>, StoreError>>;

    /// Append one calibration baseline row.
    fn append_baseline(
        &mut self,
        row: &BaselineRecord,
    ) -> impl Future<Output = Result<(), StoreError>>;

    /// The most recently appended baseline row, if any exists.
    fn latest_baseline(
        &mut self,
    ) -> impl Future<Output = Result<Option<BaselineRecord>, StoreError>>;
}
