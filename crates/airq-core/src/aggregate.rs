//! Reduction of a raw reading batch to per-pollutant means.

use thiserror_no_std::Error;

use crate::readings::{AggregatedSample, Pollutant, PollutantReading};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    /// The window held no readings for the requested pollutant. An empty
    /// window is an error, not a zero concentration.
    #[error("no {pollutant} samples in the window")]
    NoSamples { pollutant: Pollutant },
}

/// Compute the arithmetic mean concentration of one pollutant over a batch
/// of readings.
///
/// Readings for other pollutants are ignored, and no ordering is assumed:
/// the batch may mix freshly polled sensor values with rows fetched from
/// the store by timestamp range.
pub fn aggregate(
    readings: &[PollutantReading],
    pollutant: Pollutant,
    window: (u32, u32),
) -> Result<AggregatedSample, AggregateError> {
    // Sum in f64 so long windows of large concentrations keep precision.
    let mut sum = 0.0f64;
    let mut count = 0u32;
    for reading in readings.iter().filter(|r| r.pollutant == pollutant) {
        sum += f64::from(reading.concentration);
        count += 1;
    }

    if count == 0 {
        return Err(AggregateError::NoSamples { pollutant });
    }

    Ok(AggregatedSample {
        pollutant,
        mean: (sum / f64::from(count)) as f32,
        window_start: window.0,
        window_end: window.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pollutant: Pollutant, concentration: f32, timestamp: u32) -> PollutantReading {
        PollutantReading::new(pollutant, concentration, timestamp)
    }

    #[test]
    fn test_mean_of_simple_batch() {
        let readings = [
            reading(Pollutant::Pm2_5, 10.0, 100),
            reading(Pollutant::Pm2_5, 20.0, 110),
            reading(Pollutant::Pm2_5, 30.0, 120),
        ];
        let sample = aggregate(&readings, Pollutant::Pm2_5, (100, 120)).unwrap();
        assert_eq!(sample.mean, 20.0);
        assert_eq!(sample.pollutant, Pollutant::Pm2_5);
        assert_eq!(sample.window_start, 100);
        assert_eq!(sample.window_end, 120);
    }

    #[test]
    fn test_other_pollutants_are_filtered_out() {
        let readings = [
            reading(Pollutant::Pm2_5, 10.0, 100),
            reading(Pollutant::Pm10, 900.0, 100),
            reading(Pollutant::Pm2_5, 30.0, 110),
            reading(Pollutant::Eco2, 400.0, 110),
        ];
        let sample = aggregate(&readings, Pollutant::Pm2_5, (100, 110)).unwrap();
        assert_eq!(sample.mean, 20.0);
    }

    #[test]
    fn test_order_does_not_matter() {
        let forward = [
            reading(Pollutant::Pm10, 5.0, 100),
            reading(Pollutant::Pm10, 15.0, 200),
        ];
        let backward = [
            reading(Pollutant::Pm10, 15.0, 200),
            reading(Pollutant::Pm10, 5.0, 100),
        ];
        assert_eq!(
            aggregate(&forward, Pollutant::Pm10, (100, 200)).unwrap().mean,
            aggregate(&backward, Pollutant::Pm10, (100, 200)).unwrap().mean,
        );
    }

    #[test]
    fn test_empty_filtered_set_is_an_error() {
        let readings = [reading(Pollutant::Pm10, 12.0, 100)];
        assert_eq!(
            aggregate(&readings, Pollutant::Pm2_5, (100, 100)),
            Err(AggregateError::NoSamples {
                pollutant: Pollutant::Pm2_5,
            })
        );
        assert_eq!(
            aggregate(&[], Pollutant::Pm10, (0, 0)),
            Err(AggregateError::NoSamples {
                pollutant: Pollutant::Pm10,
            })
        );
    }
}
