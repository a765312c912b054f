//! Static index breakpoint tables.
//!
//! Each table maps concentration ranges to index ranges for one pollutant
//! under one computation standard. The EPA tables below are the 2012
//! revision, matching the values the deployed station has always reported.
//! They can be cross-checked against
//! <https://www.airnow.gov/aqi/aqi-calculator-concentration/>.

use serde::{Deserialize, Serialize};

use crate::readings::Pollutant;

/// An index computation standard.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    /// United States EPA Air Quality Index.
    Epa,
}

impl Standard {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Epa => "EPA",
        }
    }
}

impl core::fmt::Display for Standard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One segment of a breakpoint table: concentrations in
/// `[conc_low, conc_high]` interpolate linearly to `[index_low, index_high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub conc_low: f32,
    pub conc_high: f32,
    pub index_low: u16,
    pub index_high: u16,
}

const fn bp(conc_low: f32, conc_high: f32, index_low: u16, index_high: u16) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        index_low,
        index_high,
    }
}

/// EPA breakpoints for PM2.5, 24-hour mean, µg/m³.
///
/// Bounds are staggered at the 0.1 µg/m³ reporting precision; after
/// truncation every concentration lands in exactly one segment.
const EPA_PM2_5: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0, 50),      // Good
    bp(12.1, 35.4, 51, 100),   // Moderate
    bp(35.5, 55.4, 101, 150),  // Unhealthy for Sensitive Groups
    bp(55.5, 150.4, 151, 200), // Unhealthy
    bp(150.5, 250.4, 201, 300), // Very Unhealthy
    bp(250.5, 350.4, 301, 400), // Hazardous
    bp(350.5, 500.4, 401, 500), // Hazardous
];

/// EPA breakpoints for PM10, 24-hour mean, µg/m³, 1 µg/m³ precision.
const EPA_PM10: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 154.0, 51, 100),
    bp(155.0, 254.0, 101, 150),
    bp(255.0, 354.0, 151, 200),
    bp(355.0, 424.0, 201, 300),
    bp(425.0, 504.0, 301, 400),
    bp(505.0, 604.0, 401, 500),
];

/// Look up the breakpoint table for a (pollutant, standard) pair.
///
/// Returns `None` when the standard defines no table for the pollutant;
/// the EPA publishes no index for eCO₂ or TVOC.
pub fn lookup(pollutant: Pollutant, standard: Standard) -> Option<&'static [Breakpoint]> {
    match (standard, pollutant) {
        (Standard::Epa, Pollutant::Pm2_5) => Some(&EPA_PM2_5),
        (Standard::Epa, Pollutant::Pm10) => Some(&EPA_PM10),
        (Standard::Epa, Pollutant::Eco2 | Pollutant::Tvoc) => None,
    }
}

/// Truncate a concentration to the standard's reporting precision before
/// table lookup: 0.1 µg/m³ for PM2.5, 1 µg/m³ for PM10.
///
/// The EPA convention truncates (rather than rounds) the reported value;
/// together with the staggered table bounds this makes segment membership
/// total and unambiguous.
pub fn truncate(pollutant: Pollutant, concentration: f32) -> f32 {
    // The nudge keeps values sitting exactly on a table bound (which f32
    // may represent a hair low) from being truncated into the bucket below.
    const NUDGE: f32 = 1e-3;
    match pollutant {
        Pollutant::Pm2_5 => libm::truncf(concentration * 10.0 + NUDGE) / 10.0,
        Pollutant::Pm10 => libm::truncf(concentration + NUDGE),
        Pollutant::Eco2 | Pollutant::Tvoc => concentration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_contiguous_and_ascending() {
        for table in [&EPA_PM2_5, &EPA_PM10] {
            for pair in table.windows(2) {
                assert!(pair[0].conc_high < pair[1].conc_low);
                assert_eq!(pair[0].index_high + 1, pair[1].index_low);
            }
            assert_eq!(table[0].conc_low, 0.0);
            assert_eq!(table[0].index_low, 0);
        }
    }

    #[test]
    fn test_lookup_known_pairs() {
        assert!(lookup(Pollutant::Pm2_5, Standard::Epa).is_some());
        assert!(lookup(Pollutant::Pm10, Standard::Epa).is_some());
        assert!(lookup(Pollutant::Eco2, Standard::Epa).is_none());
        assert!(lookup(Pollutant::Tvoc, Standard::Epa).is_none());
    }

    #[test]
    fn test_truncate_reporting_precision() {
        assert_eq!(truncate(Pollutant::Pm2_5, 12.06), 12.0);
        assert_eq!(truncate(Pollutant::Pm2_5, 12.1), 12.1);
        assert_eq!(truncate(Pollutant::Pm10, 54.9), 54.0);
        assert_eq!(truncate(Pollutant::Eco2, 612.5), 612.5);
    }
}
