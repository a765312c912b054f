#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};
use static_cell::StaticCell;

use airq_core::acquisition::Monitor;
use airq_core::async_i2c_bus::AsyncI2cDevice;
use airq_core::calibration::{run_calibration, seed_baseline};
use airq_core::display::ReadoutScreen;
use airq_core::sensors::pmsa003i::Pmsa003i;
use airq_core::sensors::sgp30::Sgp30;
use airq_core::sensors::sht40::Sht40;
use airq_core::storage::sd_card::SdStore;

use airq_firmware::clock::BootClock;
use airq_firmware::hardware::{self, FixedTimeSource};
use airq_firmware::readout::OledReadout;
use airq_firmware::sensor_bank::SensorBank;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

/// Checked at the top of each cycle. Nothing asserts it on this build, but
/// the loop honors it so a debugger or future task can stop the monitor
/// cleanly between cycles.
static SHUTDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static SENSOR_BUS: StaticCell<
    AsyncMutex<CriticalSectionRawMutex, esp_hal::i2c::master::I2c<'static, esp_hal::Async>>,
> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    // Sensors share the async I2C bus; each driver gets its own handle.
    let i2c0 = hardware::create_sensor_i2c(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9);
    let sensor_bus = SENSOR_BUS.init(AsyncMutex::new(i2c0));

    let pm = Pmsa003i::new(AsyncI2cDevice::new(sensor_bus));
    let mut voc = Sgp30::new(AsyncI2cDevice::new(sensor_bus));
    let env = Sht40::new(AsyncI2cDevice::new(sensor_bus));

    // SD card on SPI2.
    let spi_bus = Spi::new(peripherals.SPI2, SpiConfig::default())
        .unwrap()
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO35)
        .with_miso(peripherals.GPIO37);
    let cs = Output::new(peripherals.GPIO34, Level::High, OutputConfig::default());
    let spi_device =
        ExclusiveDevice::new(spi_bus, cs, Delay::new()).expect("Failed to wrap the SD SPI bus");
    let sd_card = hardware::init_sd_card(spi_device, Delay::new());
    let mut store = SdStore::new(sd_card, FixedTimeSource);

    // Provisioned configuration, or the build-time defaults.
    let monitor_config = store.load_config().unwrap_or_default();

    // OLED on its own blocking bus.
    let i2c1 =
        hardware::create_display_i2c(peripherals.I2C1, peripherals.GPIO17, peripherals.GPIO18);
    let interface = I2CDisplayInterface::new(i2c1);
    let mut display = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    display.init().expect("Failed to initialize display");
    let readout = OledReadout::new(display, ReadoutScreen::new(monitor_config.display));

    info!("Display initialized!");

    let mut clock = BootClock;

    // VOC bring-up: start the IAQ engine, seed the last persisted baseline
    // (or the factory default), then sit out the calibration wait.
    voc.init()
        .await
        .expect("Failed to start the SGP30 IAQ engine");
    if let Err(e) = seed_baseline(&mut voc, &mut store).await {
        warn!("baseline seed failed: {e}");
    }
    run_calibration(&mut voc, &mut store, &mut clock, &monitor_config.calibration).await;

    let bank = SensorBank::new(pm, voc, env);
    let mut monitor = Monitor::new(monitor_config, bank, store, readout, clock)
        .expect("configured pollutant set has no tables under the configured standard");

    monitor.run(&SHUTDOWN).await;

    info!("monitor stopped");
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
