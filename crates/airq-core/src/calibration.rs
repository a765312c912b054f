//! Bounded-retry calibration wait for the VOC sensor.
//!
//! After power-up the SGP30's IAQ engine reports sentinel values (400 ppm
//! eCO₂, 0 ppb TVOC) until its dynamic baseline settles. The tracker below
//! turns the wait into an explicit state machine: poll the sensor, count
//! attempts, periodically persist the current baseline so a restart can
//! resume where it left off, and give up after a capped number of attempts
//! rather than spinning forever.

use embassy_time::{Duration, Timer};
use log::{info, warn};

use crate::acquisition::Clock;
use crate::config::CalibrationConfig;
use crate::readings::{CalibrationBaseline, VocReading};
use crate::sensors::sgp30::DEFAULT_BASELINE;
use crate::sensors::{BaselineSensor, SensorError};
use crate::storage::{BaselineRecord, ReadingStore};

/// Live eCO₂ value the sensor reports while its IAQ engine is settling.
pub const ECO2_SENTINEL_PPM: u16 = 400;
/// Live TVOC value the sensor reports while its IAQ engine is settling.
pub const TVOC_SENTINEL_PPB: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Still seeing sentinel readings.
    Waiting,
    /// The sensor reported a real measurement; normal cycling may begin.
    Calibrated,
    /// The attempt cap was reached; proceed uncalibrated.
    Abandoned,
}

/// What the caller should do after feeding one live reading to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// Still warming up; poll again after the poll interval.
    Retry,
    /// Still warming up, and the persist period elapsed: read the sensor's
    /// current baseline and write it to the store, then poll again.
    PersistBaseline,
    /// Calibration finished.
    Done,
    /// Attempt cap reached; log a warning and proceed anyway.
    Abandon,
}

#[derive(Debug)]
pub struct CalibrationTracker {
    phase: CalibrationPhase,
    attempts: u32,
    max_attempts: u32,
    elapsed_secs: u32,
    persist_period_secs: u32,
    poll_interval_secs: u32,
}

impl CalibrationTracker {
    pub const fn new(
        max_attempts: u32,
        persist_period_secs: u32,
        poll_interval_secs: u32,
    ) -> Self {
        Self {
            phase: CalibrationPhase::Waiting,
            attempts: 0,
            max_attempts,
            elapsed_secs: 0,
            persist_period_secs,
            poll_interval_secs,
        }
    }

    pub const fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Feed one live reading and advance the state machine.
    ///
    /// The persist cadence is recurring: every `persist_period_secs` of
    /// accumulated waiting, independent of the retry condition itself.
    pub fn observe(&mut self, reading: VocReading) -> CalibrationStep {
        match self.phase {
            CalibrationPhase::Calibrated => return CalibrationStep::Done,
            CalibrationPhase::Abandoned => return CalibrationStep::Abandon,
            CalibrationPhase::Waiting => {}
        }

        if reading.eco2_ppm != ECO2_SENTINEL_PPM && reading.tvoc_ppb != TVOC_SENTINEL_PPB {
            self.phase = CalibrationPhase::Calibrated;
            return CalibrationStep::Done;
        }

        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.phase = CalibrationPhase::Abandoned;
            return CalibrationStep::Abandon;
        }

        self.elapsed_secs += self.poll_interval_secs;
        if self.elapsed_secs >= self.persist_period_secs {
            self.elapsed_secs = 0;
            return CalibrationStep::PersistBaseline;
        }

        CalibrationStep::Retry
    }
}

/// Seed the VOC sensor's IAQ engine at startup: the most recent persisted
/// baseline row when one exists, the factory default otherwise. A store
/// failure here degrades to the default rather than blocking boot.
pub async fn seed_baseline<S, St>(sensor: &mut S, store: &mut St) -> Result<(), SensorError>
where
    S: BaselineSensor,
    St: ReadingStore,
{
    let baseline = match store.latest_baseline().await {
        Ok(Some(row)) => {
            info!(
                "restoring persisted IAQ baseline: eCO2 0x{:04X}, TVOC 0x{:04X}",
                row.eco2_baseline, row.tvoc_baseline
            );
            CalibrationBaseline {
                eco2: row.eco2_baseline,
                tvoc: row.tvoc_baseline,
            }
        }
        Ok(None) => {
            info!("no persisted IAQ baseline; seeding factory default");
            DEFAULT_BASELINE
        }
        Err(e) => {
            warn!("baseline lookup failed ({e}); seeding factory default");
            DEFAULT_BASELINE
        }
    };
    sensor.restore_baseline(baseline).await
}

/// Drive the calibration wait against the real sensor and store.
///
/// Polls until the sensor reports a settled measurement, persisting the
/// in-progress baseline on the tracker's cadence, and returns the final
/// phase once calibration finishes or is abandoned.
pub async fn run_calibration<S, St, C>(
    sensor: &mut S,
    store: &mut St,
    clock: &mut C,
    config: &CalibrationConfig,
) -> CalibrationPhase
where
    S: BaselineSensor,
    St: ReadingStore,
    C: Clock,
{
    let mut tracker = CalibrationTracker::new(
        config.max_attempts,
        config.baseline_persist_secs,
        config.poll_interval_secs,
    );

    loop {
        let reading = match sensor.read_air_quality().await {
            Ok(reading) => reading,
            Err(e) => {
                // A failed poll is indistinguishable from "not settled";
                // it spends an attempt like any sentinel reading.
                warn!("calibration poll failed: {e}");
                VocReading {
                    eco2_ppm: ECO2_SENTINEL_PPM,
                    tvoc_ppb: TVOC_SENTINEL_PPB,
                }
            }
        };

        match tracker.observe(reading) {
            CalibrationStep::Done => {
                info!(
                    "VOC sensor calibrated after {} attempts",
                    tracker.attempts()
                );
                return CalibrationPhase::Calibrated;
            }
            CalibrationStep::Abandon => {
                warn!(
                    "VOC calibration failed after {} attempts, continuing uncalibrated",
                    tracker.attempts()
                );
                return CalibrationPhase::Abandoned;
            }
            CalibrationStep::PersistBaseline => match sensor.read_baseline().await {
                Ok(baseline) => {
                    let row = BaselineRecord {
                        timestamp: clock.now_secs(),
                        eco2_baseline: baseline.eco2,
                        tvoc_baseline: baseline.tvoc,
                    };
                    if let Err(e) = store.append_baseline(&row).await {
                        warn!("baseline row dropped: {e}");
                    }
                }
                Err(e) => warn!("baseline read failed: {e}"),
            },
            CalibrationStep::Retry => {}
        }

        Timer::after(Duration::from_secs(u64::from(config.poll_interval_secs))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Observation, StoreError};
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    const SENTINEL: VocReading = VocReading {
        eco2_ppm: ECO2_SENTINEL_PPM,
        tvoc_ppb: TVOC_SENTINEL_PPB,
    };
    const SETTLED: VocReading = VocReading {
        eco2_ppm: 612,
        tvoc_ppb: 23,
    };

    #[test]
    fn test_immediate_success() {
        let mut tracker = CalibrationTracker::new(90, 20, 1);
        assert_eq!(tracker.observe(SETTLED), CalibrationStep::Done);
        assert_eq!(tracker.phase(), CalibrationPhase::Calibrated);
        assert_eq!(tracker.attempts(), 0);
    }

    #[test]
    fn test_sentinel_then_success() {
        let mut tracker = CalibrationTracker::new(90, 20, 1);
        assert_eq!(tracker.observe(SENTINEL), CalibrationStep::Retry);
        assert_eq!(tracker.observe(SENTINEL), CalibrationStep::Retry);
        assert_eq!(tracker.observe(SETTLED), CalibrationStep::Done);
        assert_eq!(tracker.attempts(), 2);
    }

    #[test]
    fn test_half_settled_reading_still_waits() {
        // TVOC at its sentinel means the IAQ engine has not settled even if
        // eCO2 moved off 400, and vice versa.
        let mut tracker = CalibrationTracker::new(90, 20, 1);
        let eco2_only = VocReading {
            eco2_ppm: 450,
            tvoc_ppb: TVOC_SENTINEL_PPB,
        };
        let tvoc_only = VocReading {
            eco2_ppm: ECO2_SENTINEL_PPM,
            tvoc_ppb: 5,
        };
        assert_eq!(tracker.observe(eco2_only), CalibrationStep::Retry);
        assert_eq!(tracker.observe(tvoc_only), CalibrationStep::Retry);
        assert_eq!(tracker.phase(), CalibrationPhase::Waiting);
    }

    #[test]
    fn test_recurring_persist_cadence() {
        let mut tracker = CalibrationTracker::new(1000, 20, 1);
        let mut persists = Vec::new();
        for attempt in 1..=60 {
            if tracker.observe(SENTINEL) == CalibrationStep::PersistBaseline {
                persists.push(attempt);
            }
        }
        assert_eq!(persists, alloc::vec![20, 40, 60]);
    }

    #[derive(Default)]
    struct RecordingSensor {
        restored: Option<CalibrationBaseline>,
    }

    impl BaselineSensor for RecordingSensor {
        async fn read_air_quality(&mut self) -> Result<VocReading, SensorError> {
            Ok(SETTLED)
        }

        async fn read_baseline(&mut self) -> Result<CalibrationBaseline, SensorError> {
            Ok(DEFAULT_BASELINE)
        }

        async fn restore_baseline(
            &mut self,
            baseline: CalibrationBaseline,
        ) -> Result<(), SensorError> {
            self.restored = Some(baseline);
            Ok(())
        }
    }

    #[derive(Default)]
    struct BaselineOnlyStore {
        baselines: Vec<BaselineRecord>,
    }

    impl ReadingStore for BaselineOnlyStore {
        async fn append_observation(&mut self, _row: &Observation) -> Result<(), StoreError> {
            Ok(())
        }

        async fn observations_within(
            &mut self,
            _window: (u32, u32),
        ) -> Result<Vec<Observation>, StoreError> {
            Ok(Vec::new())
        }

        async fn append_baseline(&mut self, row: &BaselineRecord) -> Result<(), StoreError> {
            self.baselines.push(*row);
            Ok(())
        }

        async fn latest_baseline(&mut self) -> Result<Option<BaselineRecord>, StoreError> {
            Ok(self.baselines.last().copied())
        }
    }

    #[test]
    fn test_seed_baseline_prefers_the_persisted_row() {
        let mut sensor = RecordingSensor::default();
        let mut store = BaselineOnlyStore::default();
        store.baselines.push(BaselineRecord {
            timestamp: 42,
            eco2_baseline: 0x1234,
            tvoc_baseline: 0x5678,
        });

        block_on(seed_baseline(&mut sensor, &mut store)).unwrap();
        assert_eq!(
            sensor.restored,
            Some(CalibrationBaseline {
                eco2: 0x1234,
                tvoc: 0x5678,
            })
        );
    }

    #[test]
    fn test_seed_baseline_defaults_when_store_is_empty() {
        let mut sensor = RecordingSensor::default();
        let mut store = BaselineOnlyStore::default();

        block_on(seed_baseline(&mut sensor, &mut store)).unwrap();
        assert_eq!(sensor.restored, Some(DEFAULT_BASELINE));
    }

    #[test]
    fn test_abandon_after_attempt_cap() {
        let mut tracker = CalibrationTracker::new(90, 20, 1);
        for _ in 0..89 {
            assert_ne!(tracker.observe(SENTINEL), CalibrationStep::Abandon);
        }
        // The 90th sentinel poll is the last one; the wait gives up there.
        assert_eq!(tracker.observe(SENTINEL), CalibrationStep::Abandon);
        assert_eq!(tracker.attempts(), 90);
        assert_eq!(tracker.phase(), CalibrationPhase::Abandoned);
        // Once abandoned, the tracker stays abandoned.
        assert_eq!(tracker.observe(SETTLED), CalibrationStep::Abandon);
    }
}
