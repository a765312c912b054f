//! Air Quality Index computation.
//!
//! Pure functions over the static breakpoint tables: a per-pollutant
//! sub-index by linear interpolation, and an overall index as the maximum
//! of the sub-indices. The interpolation formula is transcribed from the
//! EPA's technical assistance document:
//!
//! `index = index_low + (index_high - index_low)
//!          * (conc - conc_low) / (conc_high - conc_low)`
//!
//! rounded half-up to the nearest integer.

pub mod breakpoints;

pub use breakpoints::{Breakpoint, Standard};

use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::readings::{AqiResult, Pollutant};

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AqiError {
    /// The standard defines no breakpoint table for this pollutant. A
    /// configuration error: callers validate their pollutant set with
    /// [`validate_tables`] before entering any loop.
    #[error("no {standard} index table for {pollutant}")]
    UnknownTable {
        pollutant: Pollutant,
        standard: Standard,
    },
    /// Negative or non-finite concentrations have no index.
    #[error("{pollutant} concentration {concentration} outside the index domain")]
    OutOfDomain {
        pollutant: Pollutant,
        concentration: f32,
    },
    /// An overall index over zero pollutants is meaningless.
    #[error("no pollutant concentrations supplied")]
    EmptyInput,
}

/// Compute the sub-index for one pollutant concentration.
///
/// Concentrations above the table's nominal maximum clamp to the last
/// segment's high index, reproducing the published behavior for
/// off-the-chart readings.
pub fn sub_index(
    pollutant: Pollutant,
    concentration: f32,
    standard: Standard,
) -> Result<u16, AqiError> {
    if !(concentration >= 0.0) || !concentration.is_finite() {
        return Err(AqiError::OutOfDomain {
            pollutant,
            concentration,
        });
    }

    let table = breakpoints::lookup(pollutant, standard).ok_or(AqiError::UnknownTable {
        pollutant,
        standard,
    })?;
    let conc = breakpoints::truncate(pollutant, concentration);

    let mut ceiling = 0;
    for segment in table {
        if conc >= segment.conc_low && conc <= segment.conc_high {
            let span = segment.conc_high - segment.conc_low;
            let rise = f32::from(segment.index_high - segment.index_low);
            let index = f32::from(segment.index_low) + rise * (conc - segment.conc_low) / span;
            return Ok(libm::roundf(index) as u16);
        }
        ceiling = segment.index_high;
    }

    // Past the end of the table: clamp to the last segment's high index.
    Ok(ceiling)
}

/// Compute the overall index over several pollutant concentrations.
///
/// The overall index is the maximum of the sub-indices; the pollutant that
/// produced it is reported as dominant. On ties the earliest pollutant in
/// input order wins.
pub fn overall_index(
    concentrations: &[(Pollutant, f32)],
    standard: Standard,
) -> Result<AqiResult, AqiError> {
    if concentrations.is_empty() {
        return Err(AqiError::EmptyInput);
    }

    let mut sub_indices = Vec::with_capacity(concentrations.len());
    for &(pollutant, concentration) in concentrations {
        sub_indices.push((pollutant, sub_index(pollutant, concentration, standard)?));
    }

    let mut dominant = sub_indices[0];
    for &entry in &sub_indices[1..] {
        if entry.1 > dominant.1 {
            dominant = entry;
        }
    }

    Ok(AqiResult {
        index: dominant.1,
        dominant: dominant.0,
        sub_indices,
    })
}

/// Check at startup that every configured pollutant has a table under the
/// configured standard, so a bad pairing fails before the loop starts
/// instead of mid-cycle.
pub fn validate_tables(pollutants: &[Pollutant], standard: Standard) -> Result<(), AqiError> {
    for &pollutant in pollutants {
        breakpoints::lookup(pollutant, standard).ok_or(AqiError::UnknownTable {
            pollutant,
            standard,
        })?;
    }
    Ok(())
}

/// EPA category bands for a computed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub const fn from_index(index: u16) -> Self {
        match index {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}
