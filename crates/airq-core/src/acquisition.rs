//! The acquisition loop.
//!
//! One iteration is one cycle: check for shutdown, acquire a batch of
//! readings, aggregate per pollutant, compute the overall index, persist a
//! row, update the readout, sleep. Every per-cycle failure is caught here,
//! logged with enough context to diagnose, and survived; only startup
//! validation can refuse to run.

use core::fmt::Write;

use alloc::vec::Vec;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::aggregate::{AggregateError, aggregate};
use crate::aqi::{self, AqiCategory, AqiError};
use crate::config::MonitorConfig;
use crate::display::{Readout, format_readout};
use crate::readings::{AqiResult, EnvReading, Pollutant, PollutantReading, VocReading};
use crate::sensors::SensorError;
use crate::storage::{Observation, ReadingStore, StoreError};

/// Wall (or boot-relative) time in whole seconds. Which epoch applies is a
/// deployment decision; the loop only ever compares and stores the values.
pub trait Clock {
    fn now_secs(&mut self) -> u32;
}

/// One cycle's worth of acquired data.
pub struct SampleBatch {
    pub readings: Vec<PollutantReading>,
    /// The time span the readings cover. Single-shot sensor reads use an
    /// empty window at the poll instant.
    pub window: (u32, u32),
    pub env: Option<EnvReading>,
}

impl SampleBatch {
    /// The most recent reading of one pollutant kind, if any.
    pub fn last_of(&self, pollutant: Pollutant) -> Option<f32> {
        self.readings
            .iter()
            .rev()
            .find(|r| r.pollutant == pollutant)
            .map(|r| r.concentration)
    }

    /// Gas readings for the persisted row and the readout, when present.
    pub fn voc_reading(&self) -> Option<VocReading> {
        match (self.last_of(Pollutant::Eco2), self.last_of(Pollutant::Tvoc)) {
            (None, None) => None,
            (eco2, tvoc) => Some(VocReading {
                eco2_ppm: eco2.unwrap_or(0.0) as u16,
                tvoc_ppb: tvoc.unwrap_or(0.0) as u16,
            }),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AcquireError {
    #[error("sensor: {0}")]
    Sensor(#[from] SensorError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Where a cycle's readings come from. Which implementation a deployment
/// uses is wiring, not a runtime branch inside the loop.
pub trait SampleSource {
    fn acquire(
        &mut self,
        now: u32,
    ) -> impl Future<Output = Result<SampleBatch, AcquireError>>;
}

/// A [`SampleSource`] that replays the trailing window of persisted rows,
/// for display stations that sit downstream of a collector.
pub struct StoreWindowSource<St> {
    store: St,
    window_secs: u32,
}

impl<St: ReadingStore> StoreWindowSource<St> {
    pub fn new(store: St, window_secs: u32) -> Self {
        Self { store, window_secs }
    }
}

impl<St: ReadingStore> SampleSource for StoreWindowSource<St> {
    async fn acquire(&mut self, now: u32) -> Result<SampleBatch, AcquireError> {
        let window = (now.saturating_sub(self.window_secs), now);
        let rows = self.store.observations_within(window).await?;

        let mut readings = Vec::with_capacity(rows.len() * 4);
        let mut latest: Option<&Observation> = None;
        for row in &rows {
            readings.push(PollutantReading::new(
                Pollutant::Pm2_5,
                row.pm2_5_ug_m3,
                row.timestamp,
            ));
            readings.push(PollutantReading::new(
                Pollutant::Pm10,
                row.pm10_ug_m3,
                row.timestamp,
            ));
            readings.push(PollutantReading::new(
                Pollutant::Eco2,
                f32::from(row.eco2_ppm),
                row.timestamp,
            ));
            readings.push(PollutantReading::new(
                Pollutant::Tvoc,
                f32::from(row.tvoc_ppb),
                row.timestamp,
            ));
            if latest.is_none_or(|l| row.timestamp >= l.timestamp) {
                latest = Some(row);
            }
        }

        let env = latest.map(|row| EnvReading {
            temperature_c: row.temperature_milli_c as f32 / 1000.0,
            relative_humidity: row.humidity_milli_percent as f32 / 1000.0,
        });

        Ok(SampleBatch {
            readings,
            window,
            env,
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CycleError {
    /// Sensor or store unreachable; retried after the short backoff.
    #[error("acquire failed: {0}")]
    Acquire(AcquireError),
    /// Data-quality problem; the cycle's output is skipped.
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
    /// Data-quality problem; the cycle's output is skipped.
    #[error("index computation failed: {0}")]
    Compute(#[from] AqiError),
}

/// What one successful cycle produced, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub timestamp: u32,
    pub aqi: AqiResult,
    pub concentrations: Vec<(Pollutant, f32)>,
    pub env: Option<EnvReading>,
    pub voc: Option<VocReading>,
}

/// The long-running monitor: owns its adapters for the process lifetime
/// and runs the cycle policy over them.
pub struct Monitor<Src, St, R, C> {
    config: MonitorConfig,
    source: Src,
    store: St,
    readout: R,
    clock: C,
}

impl<Src, St, R, C> Monitor<Src, St, R, C>
where
    Src: SampleSource,
    St: ReadingStore,
    R: Readout,
    C: Clock,
{
    /// Build a monitor, refusing configurations whose pollutant set has no
    /// breakpoint tables under the configured standard. That mistake is
    /// fatal here, at startup, and never discovered mid-cycle.
    pub fn new(
        config: MonitorConfig,
        source: Src,
        store: St,
        readout: R,
        clock: C,
    ) -> Result<Self, AqiError> {
        aqi::validate_tables(&config.index_pollutants, config.standard)?;
        Ok(Self {
            config,
            source,
            store,
            readout,
            clock,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run cycles until `shutdown` is signalled. The signal is checked at
    /// the top of each cycle, never mid-I/O, so a store append is always
    /// whole or absent.
    pub async fn run(&mut self, shutdown: &Signal<CriticalSectionRawMutex, ()>) {
        info!(
            "monitor starting: {} standard, {}s cycle, {}s window",
            self.config.standard, self.config.cycle_interval_secs, self.config.sample_window_secs
        );

        loop {
            if shutdown.try_take().is_some() {
                info!("shutdown requested; leaving the loop");
                break;
            }

            let sleep_secs = match self.run_cycle().await {
                Ok(_) => self.config.cycle_interval_secs,
                Err(CycleError::Acquire(e)) => {
                    warn!("acquire failed, backing off: {e}");
                    self.config.retry_backoff_secs
                }
                Err(e) => {
                    warn!("cycle skipped: {e}");
                    self.config.cycle_interval_secs
                }
            };
            Timer::after(Duration::from_secs(u64::from(sleep_secs))).await;
        }
    }

    /// One cycle: acquire, aggregate, compute, persist, render.
    ///
    /// Persist and render failures are logged and swallowed here — a
    /// dropped row or a stale panel is the accepted symptom — while
    /// acquire/aggregate/compute failures bubble up so [`Self::run`] can
    /// pick the right sleep.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary, CycleError> {
        let now = self.clock.now_secs();

        let batch = self
            .source
            .acquire(now)
            .await
            .map_err(CycleError::Acquire)?;

        let mut concentrations = Vec::with_capacity(self.config.index_pollutants.len());
        for &pollutant in &self.config.index_pollutants {
            let sample = aggregate(&batch.readings, pollutant, batch.window)?;
            concentrations.push((pollutant, sample.mean));
        }

        let aqi = aqi::overall_index(&concentrations, self.config.standard)?;
        let category = AqiCategory::from_index(aqi.index);
        let voc = batch.voc_reading();

        let mut values: heapless::String<96> = heapless::String::new();
        for &(pollutant, mean) in &concentrations {
            let _ = write!(values, "{pollutant} {mean:.1} {}  ", pollutant.unit());
        }
        info!(
            "t={now}: {values}-> AQI {} ({})",
            aqi.index,
            category.label()
        );

        if self.config.record_observations {
            let row = observation_row(now, &concentrations, &aqi, voc, batch.env.as_ref());
            if let Err(e) = self.store.append_observation(&row).await {
                error!("t={now}: observation row dropped: {e}");
            }
        }

        let lines = format_readout(batch.env.as_ref(), voc, aqi.index);
        if let Err(e) = self.readout.show(&lines).await {
            warn!("t={now}: readout update failed: {e:?}");
        }

        Ok(CycleSummary {
            timestamp: now,
            aqi,
            concentrations,
            env: batch.env,
            voc,
        })
    }
}

fn observation_row(
    timestamp: u32,
    concentrations: &[(Pollutant, f32)],
    aqi: &AqiResult,
    voc: Option<VocReading>,
    env: Option<&EnvReading>,
) -> Observation {
    let mean_of = |wanted: Pollutant| {
        concentrations
            .iter()
            .find(|&&(pollutant, _)| pollutant == wanted)
            .map_or(0.0, |&(_, mean)| mean)
    };

    Observation {
        timestamp,
        pm2_5_ug_m3: mean_of(Pollutant::Pm2_5),
        pm10_ug_m3: mean_of(Pollutant::Pm10),
        aqi: aqi.index,
        eco2_ppm: voc.map_or(0, |v| v.eco2_ppm),
        tvoc_ppb: voc.map_or(0, |v| v.tvoc_ppb),
        temperature_milli_c: env.map_or(0, |e| (e.temperature_c * 1000.0) as i32),
        humidity_milli_percent: env.map_or(0, |e| (e.relative_humidity * 1000.0) as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::Standard;
    use crate::display::ReadoutLines;
    use crate::storage::BaselineRecord;
    use alloc::collections::VecDeque;
    use alloc::vec;
    use embassy_futures::block_on;

    struct TickClock {
        now: u32,
        step: u32,
    }

    impl Clock for TickClock {
        fn now_secs(&mut self) -> u32 {
            self.now += self.step;
            self.now
        }
    }

    fn clock() -> TickClock {
        TickClock { now: 0, step: 150 }
    }

    /// Replays a script of acquire outcomes, one per cycle.
    struct ScriptedSource {
        script: VecDeque<Result<SampleBatch, AcquireError>>,
    }

    impl SampleSource for ScriptedSource {
        async fn acquire(&mut self, _now: u32) -> Result<SampleBatch, AcquireError> {
            self.script.pop_front().expect("script exhausted")
        }
    }

    #[derive(Default)]
    struct MockStore {
        observations: Vec<Observation>,
        baselines: Vec<BaselineRecord>,
        fail_appends: bool,
    }

    impl ReadingStore for MockStore {
        async fn append_observation(&mut self, row: &Observation) -> Result<(), StoreError> {
            if self.fail_appends {
                return Err(StoreError::Connection {
                    details: "mock store down",
                });
            }
            self.observations.push(*row);
            Ok(())
        }

        async fn observations_within(
            &mut self,
            window: (u32, u32),
        ) -> Result<Vec<Observation>, StoreError> {
            Ok(self
                .observations
                .iter()
                .filter(|row| row.timestamp >= window.0 && row.timestamp <= window.1)
                .copied()
                .collect())
        }

        async fn append_baseline(&mut self, row: &BaselineRecord) -> Result<(), StoreError> {
            self.baselines.push(*row);
            Ok(())
        }

        async fn latest_baseline(&mut self) -> Result<Option<BaselineRecord>, StoreError> {
            Ok(self.baselines.last().copied())
        }
    }

    #[derive(Default)]
    struct MockReadout {
        shown: Vec<ReadoutLines>,
    }

    impl Readout for MockReadout {
        type Error = ();

        async fn show(&mut self, lines: &ReadoutLines) -> Result<(), ()> {
            self.shown.push(lines.clone());
            Ok(())
        }
    }

    fn sensor_batch(now: u32, pm2_5: f32, pm10: f32) -> SampleBatch {
        SampleBatch {
            readings: vec![
                PollutantReading::new(Pollutant::Pm2_5, pm2_5, now),
                PollutantReading::new(Pollutant::Pm10, pm10, now),
                PollutantReading::new(Pollutant::Eco2, 612.0, now),
                PollutantReading::new(Pollutant::Tvoc, 23.0, now),
            ],
            window: (now, now),
            env: Some(EnvReading {
                temperature_c: 21.5,
                relative_humidity: 45.2,
            }),
        }
    }

    fn monitor(
        script: VecDeque<Result<SampleBatch, AcquireError>>,
    ) -> Monitor<ScriptedSource, MockStore, MockReadout, TickClock> {
        Monitor::new(
            MonitorConfig::default(),
            ScriptedSource { script },
            MockStore::default(),
            MockReadout::default(),
            clock(),
        )
        .unwrap()
    }

    #[test]
    fn test_successful_cycle_persists_and_renders() {
        let mut monitor = monitor(VecDeque::from([Ok(sensor_batch(150, 12.0, 54.0))]));

        let summary = block_on(monitor.run_cycle()).unwrap();
        assert_eq!(summary.aqi.index, 50);
        assert_eq!(summary.aqi.dominant, Pollutant::Pm2_5);

        assert_eq!(monitor.store.observations.len(), 1);
        let row = monitor.store.observations[0];
        assert_eq!(row.timestamp, 150);
        assert_eq!(row.pm2_5_ug_m3, 12.0);
        assert_eq!(row.pm10_ug_m3, 54.0);
        assert_eq!(row.aqi, 50);
        assert_eq!(row.eco2_ppm, 612);
        assert_eq!(row.tvoc_ppb, 23);
        assert_eq!(row.temperature_milli_c, 21_500);

        assert_eq!(monitor.readout.shown.len(), 1);
        assert_eq!(monitor.readout.shown[0][2].as_str(), "AQI 50");
    }

    #[test]
    fn test_flaky_sensor_skips_one_cycle_then_recovers() {
        let failure = AcquireError::Sensor(SensorError::ReadFailed {
            sensor: "PMSA003I",
            details: "i2c transfer failed",
        });
        let mut monitor = monitor(VecDeque::from([
            Err(failure),
            Ok(sensor_batch(300, 6.0, 30.0)),
        ]));

        // First cycle fails at acquire: nothing persisted, nothing shown.
        assert_eq!(
            block_on(monitor.run_cycle()),
            Err(CycleError::Acquire(failure))
        );
        assert!(monitor.store.observations.is_empty());
        assert!(monitor.readout.shown.is_empty());

        // Next cycle succeeds as if nothing happened.
        let summary = block_on(monitor.run_cycle()).unwrap();
        assert_eq!(summary.aqi.index, 28);
        assert_eq!(monitor.store.observations.len(), 1);
    }

    #[test]
    fn test_empty_window_skips_output() {
        let empty = SampleBatch {
            readings: Vec::new(),
            window: (0, 3600),
            env: None,
        };
        let mut monitor = monitor(VecDeque::from([Ok(empty)]));

        assert_eq!(
            block_on(monitor.run_cycle()),
            Err(CycleError::Aggregate(AggregateError::NoSamples {
                pollutant: Pollutant::Pm2_5,
            }))
        );
        assert!(monitor.store.observations.is_empty());
        assert!(monitor.readout.shown.is_empty());
    }

    #[test]
    fn test_persist_failure_is_survived() {
        let mut monitor = monitor(VecDeque::from([Ok(sensor_batch(150, 12.0, 54.0))]));
        monitor.store.fail_appends = true;

        let summary = block_on(monitor.run_cycle()).unwrap();
        assert_eq!(summary.aqi.index, 50);
        // The row is gone but the readout still updated.
        assert!(monitor.store.observations.is_empty());
        assert_eq!(monitor.readout.shown.len(), 1);
    }

    #[test]
    fn test_store_schema_mismatch_backs_off_like_any_acquire_failure() {
        let failure = AcquireError::Store(StoreError::SchemaMismatch {
            expected: 32,
            actual: 7,
        });
        let mut monitor = monitor(VecDeque::from([Err(failure)]));
        assert_eq!(
            block_on(monitor.run_cycle()),
            Err(CycleError::Acquire(failure))
        );
    }

    #[test]
    fn test_unknown_table_is_fatal_at_startup() {
        let config = MonitorConfig {
            index_pollutants: [Pollutant::Pm2_5, Pollutant::Tvoc],
            ..MonitorConfig::default()
        };
        let result = Monitor::new(
            config,
            ScriptedSource {
                script: VecDeque::new(),
            },
            MockStore::default(),
            MockReadout::default(),
            clock(),
        );
        assert_eq!(
            result.err(),
            Some(AqiError::UnknownTable {
                pollutant: Pollutant::Tvoc,
                standard: Standard::Epa,
            })
        );
    }

    #[test]
    fn test_store_window_source_aggregates_the_trailing_hour() {
        let mut store = MockStore::default();
        let rows = [
            (1000, 10.0, 100.0),
            (2000, 20.0, 120.0),
            (3000, 30.0, 140.0),
            // Outside the hour window at now = 4600.
            (500, 99.0, 999.0),
        ];
        for (timestamp, pm2_5, pm10) in rows {
            store.observations.push(Observation {
                timestamp,
                pm2_5_ug_m3: pm2_5,
                pm10_ug_m3: pm10,
                aqi: 0,
                eco2_ppm: 600,
                tvoc_ppb: 20,
                temperature_milli_c: 21_000,
                humidity_milli_percent: 45_000,
            });
        }

        let mut source = StoreWindowSource::new(store, 3600);
        let batch = block_on(source.acquire(4600)).unwrap();

        let pm2_5 = aggregate(&batch.readings, Pollutant::Pm2_5, batch.window).unwrap();
        assert_eq!(pm2_5.mean, 20.0);
        let pm10 = aggregate(&batch.readings, Pollutant::Pm10, batch.window).unwrap();
        assert_eq!(pm10.mean, 120.0);

        // Environment comes from the newest row in the window.
        let env = batch.env.unwrap();
        assert_eq!(env.temperature_c, 21.0);
        assert_eq!(batch.window, (1000, 4600));
    }

    #[test]
    fn test_display_only_deployment_records_nothing() {
        let config = MonitorConfig {
            record_observations: false,
            ..MonitorConfig::default()
        };
        let mut monitor = Monitor::new(
            config,
            ScriptedSource {
                script: VecDeque::from([Ok(sensor_batch(150, 12.0, 54.0))]),
            },
            MockStore::default(),
            MockReadout::default(),
            clock(),
        )
        .unwrap();

        block_on(monitor.run_cycle()).unwrap();
        assert!(monitor.store.observations.is_empty());
        assert_eq!(monitor.readout.shown.len(), 1);
    }
}
