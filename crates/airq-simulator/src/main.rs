//! Desktop simulator for the airq-rs monitoring loop.
//!
//! Runs the real core [`Monitor`] against synthetic sensors, an in-memory
//! store, and an SDL2 window standing in for the OLED panel, so the whole
//! cycle policy can be watched without hardware.
//!
//! Cycles run on an accelerated cadence. The third sensor cycle injects
//! one transient read failure, so the log shows the skip-and-recover path.
//!
//! # Selecting the deployment shape
//!
//! | `AIRQ_SIM_SOURCE` | Behavior                                        |
//! |-------------------|-------------------------------------------------|
//! | unset / `sensor`  | Sensor-sourced collector that persists rows      |
//! | `store`           | Display-only station replaying a seeded history  |
//!
//! Press Q or Escape (or close the window) to quit.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use log::{info, warn};

use airq_core::acquisition::{
    AcquireError, Clock, Monitor, SampleBatch, SampleSource, StoreWindowSource,
};
use airq_core::config::MonitorConfig;
use airq_core::display::{Readout, ReadoutLines, ReadoutScreen};
use airq_core::readings::{EnvReading, Pollutant, PollutantReading};
use airq_core::sensors::SensorError;
use airq_core::storage::{BaselineRecord, Observation, ReadingStore, StoreError};

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// Target frame duration (~30 FPS) for event pumping.
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Accelerated cycle cadence; the deployed stations sleep minutes.
const CYCLE_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Mock adapters
// ---------------------------------------------------------------------------

/// Synthetic sensor suite producing slowly varying values from the
/// timestamp, so repeated runs are reproducible.
struct MockSensorSuite {
    cycles: u32,
}

impl MockSensorSuite {
    fn new() -> Self {
        Self { cycles: 0 }
    }
}

impl SampleSource for MockSensorSuite {
    async fn acquire(&mut self, now: u32) -> Result<SampleBatch, AcquireError> {
        self.cycles += 1;
        if self.cycles == 3 {
            return Err(AcquireError::Sensor(SensorError::ReadFailed {
                sensor: "PMSA003I",
                details: "injected transient fault",
            }));
        }

        let t = f64::from(now);
        let pm2_5 = (8.0 + 6.0 * (t / 120.0).sin() + 1.5 * (t / 37.0).cos()).max(0.0);
        let pm10 = (30.0 + 18.0 * (t / 180.0).sin()).max(0.0);
        let eco2 = 600.0 + 150.0 * (t / 300.0).sin();
        let tvoc = 25.0 + 10.0 * (t / 90.0).cos();

        let readings = vec![
            PollutantReading::new(Pollutant::Pm2_5, pm2_5 as f32, now),
            PollutantReading::new(Pollutant::Pm10, pm10 as f32, now),
            PollutantReading::new(Pollutant::Eco2, eco2 as f32, now),
            PollutantReading::new(Pollutant::Tvoc, tvoc as f32, now),
        ];

        let env = EnvReading {
            temperature_c: (23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos()) as f32,
            relative_humidity: (50.0 + 10.0 * (t / 180.0).sin()) as f32,
        };

        Ok(SampleBatch {
            readings,
            window: (now, now),
            env: Some(env),
        })
    }
}

/// In-memory store shared between the monitor and the seeding code.
#[derive(Clone, Default)]
struct MemoryStore {
    rows: Rc<RefCell<Vec<Observation>>>,
    baselines: Rc<RefCell<Vec<BaselineRecord>>>,
}

impl ReadingStore for MemoryStore {
    async fn append_observation(&mut self, row: &Observation) -> Result<(), StoreError> {
        self.rows.borrow_mut().push(*row);
        Ok(())
    }

    async fn observations_within(
        &mut self,
        window: (u32, u32),
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|row| row.timestamp >= window.0 && row.timestamp <= window.1)
            .copied()
            .collect())
    }

    async fn append_baseline(&mut self, row: &BaselineRecord) -> Result<(), StoreError> {
        self.baselines.borrow_mut().push(*row);
        Ok(())
    }

    async fn latest_baseline(&mut self) -> Result<Option<BaselineRecord>, StoreError> {
        Ok(self.baselines.borrow().last().copied())
    }
}

/// Seed one hour of plausible history so the store-sourced deployment has
/// a window to aggregate on its first cycle.
fn seed_history(store: &MemoryStore, now: u32) {
    let interval = 150;
    let count = 24;
    let mut rows = store.rows.borrow_mut();
    for i in 1..=count {
        let timestamp = now.saturating_sub((count - i) * interval);
        let t = f64::from(timestamp);
        rows.push(Observation {
            timestamp,
            pm2_5_ug_m3: (8.0 + 6.0 * (t / 1800.0).sin()) as f32,
            pm10_ug_m3: (30.0 + 20.0 * (t / 2400.0).sin()) as f32,
            aqi: 0,
            eco2_ppm: (600.0 + 150.0 * (t / 3000.0).sin()) as u16,
            tvoc_ppb: 25,
            temperature_milli_c: ((23.0 + 2.0 * (t / 1800.0).sin()) * 1000.0) as i32,
            humidity_milli_percent: ((50.0 + 8.0 * (t / 2400.0).sin()) * 1000.0) as i32,
        });
    }
    info!("seeded {count} historical rows");
}

// ---------------------------------------------------------------------------
// Window readout
// ---------------------------------------------------------------------------

/// The SDL2 display and window, shared between the readout adapter and the
/// event-pumping main loop.
struct SimPanel {
    display: SimulatorDisplay<BinaryColor>,
    window: Window,
}

struct WindowReadout {
    panel: Rc<RefCell<SimPanel>>,
    screen: ReadoutScreen,
}

impl Readout for WindowReadout {
    type Error = core::convert::Infallible;

    async fn show(&mut self, lines: &ReadoutLines) -> Result<(), Self::Error> {
        let panel = &mut *self.panel.borrow_mut();
        let _ = self.screen.draw(lines, &mut panel.display);
        panel.window.update(&panel.display);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&mut self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting airq-rs simulator");

    let config = MonitorConfig::default();
    let geometry = config.display;

    // SDL2 display and window
    let display = SimulatorDisplay::<BinaryColor>::new(Size::new(
        u32::from(geometry.width),
        u32::from(geometry.height),
    ));
    let output_settings = OutputSettingsBuilder::new()
        .scale(WINDOW_SCALE)
        .theme(BinaryColorTheme::OledBlue)
        .build();
    let window = Window::new("airq Simulator", &output_settings);
    let panel = Rc::new(RefCell::new(SimPanel { display, window }));

    let readout = WindowReadout {
        panel: Rc::clone(&panel),
        screen: ReadoutScreen::new(geometry),
    };

    let store = MemoryStore::default();
    let mut clock = SystemClock;

    let source_mode = std::env::var("AIRQ_SIM_SOURCE").unwrap_or_default();
    if source_mode == "store" {
        info!("store-sourced display station (no rows written back)");
        seed_history(&store, clock.now_secs());
        let config = MonitorConfig {
            record_observations: false,
            ..config
        };
        let source = StoreWindowSource::new(store.clone(), config.sample_window_secs);
        let monitor = Monitor::new(config, source, store, readout, clock)
            .expect("default pollutant set must validate");
        run_simulation(monitor, panel);
    } else {
        info!("sensor-sourced collector station");
        let monitor = Monitor::new(config, MockSensorSuite::new(), store.clone(), readout, clock)
            .expect("default pollutant set must validate");
        run_simulation(monitor, panel);
        info!("{} rows persisted this session", store.rows.borrow().len());
    }
}

/// Pump SDL events and run one monitor cycle per [`CYCLE_INTERVAL`].
fn run_simulation<Src: SampleSource>(
    mut monitor: Monitor<Src, MemoryStore, WindowReadout, SystemClock>,
    panel: Rc<RefCell<SimPanel>>,
) {
    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    {
        let panel = &mut *panel.borrow_mut();
        let _ = panel.display.clear(BinaryColor::Off);
        panel.window.update(&panel.display);
    }

    // None until the first cycle, which runs immediately.
    let mut last_cycle: Option<Instant> = None;

    'running: loop {
        for event in panel.borrow_mut().window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                }
                _ => {}
            }
        }

        if last_cycle.is_none_or(|t| t.elapsed() >= CYCLE_INTERVAL) {
            match embassy_futures::block_on(monitor.run_cycle()) {
                Ok(summary) => info!(
                    "cycle ok: AQI {} (dominant {})",
                    summary.aqi.index, summary.aqi.dominant
                ),
                Err(e) => warn!("cycle skipped: {e}"),
            }
            last_cycle = Some(Instant::now());
        }

        std::thread::sleep(FRAME_DURATION);
    }

    info!("Simulator exiting");
}
